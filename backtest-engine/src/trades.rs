use common::{Direction, PriceBar, Side, Trade};

/// Rebuilds discrete trade events from a signal series.
///
/// Every long entry commits a fixed slice of the initial capital. Only the
/// long side is recorded: a sell signal closes an open long (with pnl) and
/// then flips the book short, but the short leg itself never produces a
/// trade record or a pnl.
#[derive(Debug, Clone)]
pub struct TradeRecorder {
    initial_capital: f64,
    position_size_pct: f64,
}

/// Open long position
#[derive(Debug, Clone, Copy)]
struct Entry {
    price: f64,
    shares: i64,
}

impl TradeRecorder {
    pub fn new(initial_capital: f64, position_size_pct: f64) -> Self {
        Self {
            initial_capital,
            position_size_pct,
        }
    }

    /// Walk bars in order and emit BUY/SELL records
    pub fn record(&self, bars: &[PriceBar], signals: &[Direction]) -> Vec<Trade> {
        let mut trades = Vec::new();
        let mut current = Direction::Flat;
        let mut entry: Option<Entry> = None;

        for (bar, signal) in bars.iter().zip(signals) {
            match signal {
                Direction::Long if current != Direction::Long => {
                    let trade = self.open_long(bar);
                    entry = Some(Entry {
                        price: bar.close,
                        shares: trade.shares,
                    });
                    current = Direction::Long;
                    trades.push(trade);
                }
                Direction::Short if current != Direction::Short => {
                    if let (Direction::Long, Some(open)) = (current, entry) {
                        trades.push(Self::close_long(bar, open));
                    }
                    current = Direction::Short;
                    entry = None;
                }
                _ => {}
            }
        }

        trades
    }

    fn open_long(&self, bar: &PriceBar) -> Trade {
        let budget = self.initial_capital * self.position_size_pct;
        Trade {
            date: bar.date,
            side: Side::Buy,
            price: bar.close,
            shares: (budget / bar.close).floor() as i64,
            amount: budget.floor() as i64,
            pnl: 0,
        }
    }

    /// Close at this bar's close; pnl truncates toward zero
    fn close_long(bar: &PriceBar, open: Entry) -> Trade {
        let shares = open.shares as f64;
        Trade {
            date: bar.date,
            side: Side::Sell,
            price: bar.close,
            shares: open.shares,
            amount: (shares * bar.close).floor() as i64,
            pnl: (shares * (bar.close - open.price)).trunc() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use common::Direction::{Flat, Long, Short};

    fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::flat(start + Duration::days(i as i64), c))
            .collect()
    }

    #[test]
    fn test_buy_then_sell() {
        let bars = make_bars(&[100.0, 105.0, 120.0]);
        let signals = vec![Long, Flat, Short];
        let recorder = TradeRecorder::new(1_000_000.0, 0.1);

        let trades = recorder.record(&bars, &signals);
        assert_eq!(trades.len(), 2);

        let buy = &trades[0];
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.price, 100.0);
        assert_eq!(buy.shares, 1000);
        assert_eq!(buy.amount, 100_000);
        assert_eq!(buy.pnl, 0);

        let sell = &trades[1];
        assert_eq!(sell.side, Side::Sell);
        assert_eq!(sell.date, bars[2].date);
        assert_eq!(sell.shares, 1000);
        assert_eq!(sell.amount, 120_000);
        assert_eq!(sell.pnl, 20_000);
    }

    #[test]
    fn test_short_side_is_never_recorded() {
        let bars = make_bars(&[100.0, 90.0, 80.0, 85.0]);
        // opens short first, then buys back via a long signal
        let signals = vec![Short, Flat, Long, Short];
        let recorder = TradeRecorder::new(1_000_000.0, 0.1);

        let trades = recorder.record(&bars, &signals);
        let sides: Vec<Side> = trades.iter().map(|t| t.side).collect();
        assert_eq!(sides, vec![Side::Buy, Side::Sell]);
        assert_eq!(trades[0].price, 80.0);
        assert_eq!(trades[0].shares, 1250);
        assert_eq!(trades[1].pnl, 1250 * 5);
    }

    #[test]
    fn test_repeated_signals_ignored() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        let signals = vec![Long, Long, Short, Short, Long];
        let recorder = TradeRecorder::new(10_000.0, 0.1);

        let trades = recorder.record(&bars, &signals);
        let sides: Vec<Side> = trades.iter().map(|t| t.side).collect();
        assert_eq!(sides, vec![Side::Buy, Side::Sell, Side::Buy]);
    }

    #[test]
    fn test_losing_trade_pnl_truncates_toward_zero() {
        let bars = make_bars(&[30.0, 29.7]);
        let signals = vec![Long, Short];
        let recorder = TradeRecorder::new(1000.0, 0.1);

        let trades = recorder.record(&bars, &signals);
        // 3 shares * -0.3 = -0.9 -> 0
        assert_eq!(trades[0].shares, 3);
        assert_eq!(trades[1].pnl, 0);
        assert_eq!(trades[1].amount, 89);
    }

    #[test]
    fn test_sizing_invariant() {
        let closes = [37.3, 52.9, 18.45, 77.0, 101.2, 9.99];
        let bars = make_bars(&closes);
        let signals = vec![Long, Short, Long, Short, Long, Short];
        let capital = 1_000_000.0;
        let recorder = TradeRecorder::new(capital, 0.1);

        for trade in recorder
            .record(&bars, &signals)
            .iter()
            .filter(|t| t.side == Side::Buy)
        {
            assert_eq!(trade.amount, (capital * 0.1_f64).floor() as i64);
            assert_eq!(trade.shares, (trade.amount as f64 / trade.price).floor() as i64);
        }
    }

    #[test]
    fn test_no_signals_no_trades() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let recorder = TradeRecorder::new(1000.0, 0.1);
        assert!(recorder.record(&bars, &[Flat; 3]).is_empty());
    }
}
