//! The simulated terminal
//!
//! Implements the `Terminal` port with seeded random-walk bars. Every data
//! call passes through an occupancy tracker so tests can assert that the
//! connection manager never lets two callers touch the terminal at once.

use crate::config::{SimConfig, base_price};
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use log::debug;
use meridian_core::{
    AccountInfo, Bar, OrderSide, Price, SymbolInfo, TerminalInfo, TerminalVersion, Tick, TickFlags,
    Timeframe, Timestamp, Volume,
};
use meridian_ports::{Terminal, TerminalError, error::TerminalResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Snapshot of the simulator's call counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallCounters {
    pub connects: u64,
    pub bars: u64,
    pub ticks: u64,
    pub info: u64,
    pub catalog: u64,
    pub session: u64,
    pub calc: u64,
    /// Highest number of data calls observed in flight at once
    pub max_occupancy: u32,
}

#[derive(Default)]
struct Counters {
    connects: AtomicU64,
    bars: AtomicU64,
    ticks: AtomicU64,
    info: AtomicU64,
    catalog: AtomicU64,
    session: AtomicU64,
    calc: AtomicU64,
    occupancy: AtomicU32,
    max_occupancy: AtomicU32,
}

/// Simulated terminal. Cheap to share behind an `Arc`.
pub struct SimTerminal {
    config: SimConfig,
    symbols: BTreeMap<String, SymbolInfo>,
    connected: AtomicBool,
    fail_connects: AtomicU32,
    fail_calls: AtomicU32,
    counters: Counters,
}

impl SimTerminal {
    pub fn new(config: SimConfig) -> Self {
        let symbols = config
            .symbols
            .iter()
            .cloned()
            .map(|s| (s.name.clone(), s))
            .collect();
        Self {
            config,
            symbols,
            connected: AtomicBool::new(false),
            fail_connects: AtomicU32::new(0),
            fail_calls: AtomicU32::new(0),
            counters: Counters::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SimConfig::default())
    }

    /// Make the next `n` connect attempts fail
    pub fn fail_next_connects(&self, n: u32) {
        self.fail_connects.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` data calls fail with a connection-class error
    pub fn fail_next_data_calls(&self, n: u32) {
        self.fail_calls.store(n, Ordering::SeqCst);
    }

    pub fn counters(&self) -> CallCounters {
        CallCounters {
            connects: self.counters.connects.load(Ordering::SeqCst),
            bars: self.counters.bars.load(Ordering::SeqCst),
            ticks: self.counters.ticks.load(Ordering::SeqCst),
            info: self.counters.info.load(Ordering::SeqCst),
            catalog: self.counters.catalog.load(Ordering::SeqCst),
            session: self.counters.session.load(Ordering::SeqCst),
            calc: self.counters.calc.load(Ordering::SeqCst),
            max_occupancy: self.counters.max_occupancy.load(Ordering::SeqCst),
        }
    }

    /// Run one data call inside the occupancy window.
    ///
    /// The short sleep keeps the window open across an await point, which is
    /// what lets concurrency tests catch overlapping callers.
    async fn data_call<R>(
        &self,
        counter: &AtomicU64,
        f: impl FnOnce() -> TerminalResult<R>,
    ) -> TerminalResult<R> {
        if self
            .fail_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TerminalError::ConnectionLost(
                "injected data-call failure".to_string(),
            ));
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TerminalError::NotConnected);
        }

        let in_flight = self.counters.occupancy.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .max_occupancy
            .fetch_max(in_flight, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;
        let result = f();
        self.counters.occupancy.fetch_sub(1, Ordering::SeqCst);
        counter.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn require_symbol(&self, symbol: &str) -> TerminalResult<SymbolInfo> {
        self.lookup(symbol)
            .ok_or_else(|| TerminalError::SymbolUnknown(symbol.to_string()))
    }

    fn lookup(&self, symbol: &str) -> Option<SymbolInfo> {
        let mut info = self.symbols.get(symbol)?.clone();
        let mid = Decimal::from_f64_retain(base_price(symbol))
            .unwrap_or_default()
            .round_dp(info.digits);
        let half_spread = info.point * Decimal::from(info.spread) / Decimal::from(2);
        info.bid = (mid - half_spread).round_dp(info.digits);
        info.ask = (mid + half_spread).round_dp(info.digits);
        Some(info)
    }

    fn walk_rng(&self, symbol: &str, salt: u64) -> StdRng {
        let mut hasher = DefaultHasher::new();
        self.config.seed.hash(&mut hasher);
        symbol.hash(&mut hasher);
        salt.hash(&mut hasher);
        StdRng::seed_from_u64(hasher.finish())
    }

    /// Generate `count` bars at positions `start_pos..start_pos + count`
    /// (position 0 = most recent), oldest first.
    fn synth_bars(
        &self,
        info: &SymbolInfo,
        timeframe: Timeframe,
        start_pos: u32,
        count: u32,
    ) -> Vec<Bar> {
        let total = (start_pos as usize) + (count as usize);
        let mut rng = self.walk_rng(&info.name, timeframe.minutes() as u64);
        let step = ChronoDuration::minutes(timeframe.minutes());
        let digits = info.digits;
        let mut price = base_price(&info.name);
        let mut bars = Vec::with_capacity(count as usize);

        for k in 0..total {
            let open = price;
            price *= 1.0 + rng.gen_range(-5.0e-4..5.0e-4);
            let close = price;
            let wick = rng.gen_range(0.0..2.0e-4);
            let high = open.max(close) * (1.0 + wick);
            let low = open.min(close) * (1.0 - wick);
            if k >= count as usize {
                continue;
            }
            let position = (total - 1 - k) as i64;
            let time = self.config.anchor - step * position as i32;
            bars.push(Bar {
                time,
                open: to_price(open, digits),
                high: to_price(high, digits),
                low: to_price(low, digits),
                close: to_price(close, digits),
                tick_volume: rng.gen_range(50..5000),
                spread: info.spread,
                real_volume: 0,
            });
        }
        bars
    }

    /// Position on the bar grid of the bar covering `time`
    fn position_of(&self, time: Timestamp, timeframe: Timeframe) -> u32 {
        let elapsed = (self.config.anchor - time).num_minutes();
        if elapsed <= 0 {
            return 0;
        }
        (elapsed / timeframe.minutes()) as u32
    }
}

fn to_price(value: f64, digits: u32) -> Price {
    Decimal::from_f64_retain(value)
        .unwrap_or_default()
        .round_dp(digits)
}

/// `*`-wildcard match used by the catalog group filter
pub(crate) fn wildcard_match(pattern: &str, name: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == name;
    }
    let segments: Vec<&str> = pattern.split('*').collect();
    let mut rest = name;
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(segment) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == segments.len() - 1 {
            return rest.ends_with(segment);
        } else {
            match rest.find(segment) {
                Some(at) => rest = &rest[at + segment.len()..],
                None => return false,
            }
        }
    }
    true
}

#[async_trait]
impl Terminal for SimTerminal {
    async fn connect(&self) -> TerminalResult<()> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TerminalError::ConnectionLost(
                "injected connect failure".to_string(),
            ));
        }
        self.connected.store(true, Ordering::SeqCst);
        debug!("simulated terminal connected");
        Ok(())
    }

    async fn shutdown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        debug!("simulated terminal shut down");
    }

    async fn health_check(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn bars_from_pos(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: u32,
        count: u32,
    ) -> TerminalResult<Vec<Bar>> {
        let info = self.require_symbol(symbol)?;
        self.data_call(&self.counters.bars, || {
            Ok(self.synth_bars(&info, timeframe, start_pos, count))
        })
        .await
    }

    async fn bars_from(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: Timestamp,
        count: u32,
    ) -> TerminalResult<Vec<Bar>> {
        let info = self.require_symbol(symbol)?;
        let start_pos = self.position_of(from, timeframe);
        self.data_call(&self.counters.bars, || {
            Ok(self.synth_bars(&info, timeframe, start_pos, count))
        })
        .await
    }

    async fn bars_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: Timestamp,
        to: Timestamp,
    ) -> TerminalResult<Vec<Bar>> {
        if to < from {
            return Err(TerminalError::History(format!(
                "empty range: {from} .. {to}"
            )));
        }
        let info = self.require_symbol(symbol)?;
        let newest = self.position_of(to, timeframe);
        let oldest = self.position_of(from, timeframe);
        let count = oldest.saturating_sub(newest) + 1;
        self.data_call(&self.counters.bars, || {
            Ok(self.synth_bars(&info, timeframe, newest, count))
        })
        .await
    }

    async fn ticks_from(
        &self,
        symbol: &str,
        from: Timestamp,
        count: u32,
        _flags: TickFlags,
    ) -> TerminalResult<Vec<Tick>> {
        let info = self.require_symbol(symbol)?;
        self.data_call(&self.counters.ticks, || {
            let mut rng = self.walk_rng(&info.name, u64::MAX);
            let digits = info.digits;
            let spread = info.point * Decimal::from(info.spread);
            let mut price = base_price(&info.name);
            let ticks = (0..count)
                .map(|i| {
                    price *= 1.0 + rng.gen_range(-1.0e-4..1.0e-4);
                    let bid = to_price(price, digits);
                    Tick {
                        time: from + ChronoDuration::seconds(i as i64),
                        bid,
                        ask: (bid + spread).round_dp(digits),
                        last: bid,
                        volume: rng.gen_range(1..50),
                    }
                })
                .collect();
            Ok(ticks)
        })
        .await
    }

    async fn ticks_range(
        &self,
        symbol: &str,
        from: Timestamp,
        to: Timestamp,
        flags: TickFlags,
    ) -> TerminalResult<Vec<Tick>> {
        if to < from {
            return Err(TerminalError::History(format!(
                "empty range: {from} .. {to}"
            )));
        }
        let count = (to - from).num_seconds().max(0).min(10_000) as u32;
        self.ticks_from(symbol, from, count, flags).await
    }

    async fn symbol_info(&self, symbol: &str) -> TerminalResult<Option<SymbolInfo>> {
        self.data_call(&self.counters.info, || Ok(self.lookup(symbol)))
            .await
    }

    async fn symbol_tick(&self, symbol: &str) -> TerminalResult<Option<Tick>> {
        let anchor = self.config.anchor;
        self.data_call(&self.counters.info, || {
            Ok(self.lookup(symbol).map(|info| Tick {
                time: anchor,
                bid: info.bid,
                ask: info.ask,
                last: info.bid,
                volume: 1,
            }))
        })
        .await
    }

    async fn symbol_select(&self, symbol: &str, _enable: bool) -> TerminalResult<bool> {
        self.data_call(&self.counters.info, || {
            Ok(self.symbols.contains_key(symbol))
        })
        .await
    }

    async fn symbols_total(&self) -> TerminalResult<u32> {
        self.data_call(&self.counters.catalog, || Ok(self.symbols.len() as u32))
            .await
    }

    async fn symbol_names(&self, group: Option<&str>) -> TerminalResult<Vec<String>> {
        self.data_call(&self.counters.catalog, || {
            let names = self
                .symbols
                .keys()
                .filter(|name| group.is_none_or(|g| wildcard_match(g, name)))
                .cloned()
                .collect();
            Ok(names)
        })
        .await
    }

    async fn account_info(&self) -> TerminalResult<AccountInfo> {
        let leverage = self.config.leverage;
        self.data_call(&self.counters.session, || {
            Ok(AccountInfo {
                login: 5_000_001,
                name: "Meridian Sim".to_string(),
                server: "MeridianSim-Demo".to_string(),
                currency: "USD".to_string(),
                leverage,
                balance: Decimal::from(100_000),
                equity: Decimal::from(100_000),
                margin: Decimal::ZERO,
                margin_free: Decimal::from(100_000),
            })
        })
        .await
    }

    async fn terminal_info(&self) -> TerminalResult<TerminalInfo> {
        let connected = self.connected.load(Ordering::SeqCst);
        self.data_call(&self.counters.session, || {
            Ok(TerminalInfo {
                name: "Meridian Simulated Terminal".to_string(),
                company: "Meridian".to_string(),
                build: 4200,
                connected,
            })
        })
        .await
    }

    async fn version(&self) -> TerminalResult<TerminalVersion> {
        self.data_call(&self.counters.session, || {
            Ok(TerminalVersion {
                version: 5,
                build: 4200,
                release_date: "2024-06-01".to_string(),
            })
        })
        .await
    }

    async fn calc_margin(
        &self,
        _side: OrderSide,
        symbol: &str,
        volume: Volume,
        price: Price,
    ) -> TerminalResult<Price> {
        let info = self.require_symbol(symbol)?;
        let leverage = Decimal::from(self.config.leverage);
        self.data_call(&self.counters.calc, || {
            Ok((volume * info.contract_size * price / leverage).round_dp(2))
        })
        .await
    }

    async fn calc_profit(
        &self,
        side: OrderSide,
        symbol: &str,
        volume: Volume,
        price_open: Price,
        price_close: Price,
    ) -> TerminalResult<Price> {
        let info = self.require_symbol(symbol)?;
        let sign = match side {
            OrderSide::Buy => Decimal::ONE,
            OrderSide::Sell => Decimal::NEGATIVE_ONE,
        };
        self.data_call(&self.counters.calc, || {
            Ok((sign * (price_close - price_open) * volume * info.contract_size).round_dp(2))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_sim() -> SimTerminal {
        let sim = SimTerminal::with_defaults();
        sim.connected.store(true, Ordering::SeqCst);
        sim
    }

    #[test]
    fn wildcard_patterns() {
        assert!(wildcard_match("*USD*", "EURUSD"));
        assert!(wildcard_match("*USD*", "USDJPY"));
        assert!(wildcard_match("EUR*", "EURUSD"));
        assert!(wildcard_match("*JPY", "USDJPY"));
        assert!(!wildcard_match("*JPY", "EURUSD"));
        assert!(wildcard_match("EURUSD", "EURUSD"));
        assert!(!wildcard_match("EURUSD", "EURUSX"));
    }

    #[tokio::test]
    async fn bars_are_deterministic() {
        let sim = connected_sim();
        let a = sim
            .bars_from_pos("EURUSD", Timeframe::H1, 0, 100)
            .await
            .unwrap();
        let b = sim
            .bars_from_pos("EURUSD", Timeframe::H1, 0, 100)
            .await
            .unwrap();
        assert_eq!(a.len(), 100);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn bars_are_oldest_first_on_the_grid() {
        let sim = connected_sim();
        let bars = sim
            .bars_from_pos("EURUSD", Timeframe::H1, 0, 10)
            .await
            .unwrap();
        assert_eq!(bars.last().unwrap().time, sim.config.anchor);
        for pair in bars.windows(2) {
            assert_eq!((pair[1].time - pair[0].time).num_minutes(), 60);
        }
    }

    #[tokio::test]
    async fn unknown_symbol_is_rejected() {
        let sim = connected_sim();
        let err = sim
            .bars_from_pos("EURUSX", Timeframe::H1, 0, 10)
            .await
            .unwrap_err();
        assert_eq!(err, TerminalError::SymbolUnknown("EURUSX".to_string()));
    }

    #[tokio::test]
    async fn disconnected_calls_fail() {
        let sim = SimTerminal::with_defaults();
        let err = sim.symbols_total().await.unwrap_err();
        assert_eq!(err, TerminalError::NotConnected);
    }

    #[tokio::test]
    async fn injected_failures_consume_themselves() {
        let sim = connected_sim();
        sim.fail_next_data_calls(1);
        assert!(sim.symbols_total().await.is_err());
        assert!(sim.symbols_total().await.is_ok());
    }

    #[tokio::test]
    async fn group_filter_applies() {
        let sim = connected_sim();
        let usd = sim.symbol_names(Some("*USD")).await.unwrap();
        assert!(usd.contains(&"EURUSD".to_string()));
        assert!(!usd.contains(&"USDJPY".to_string()));
    }

    #[tokio::test]
    async fn margin_uses_leverage() {
        let sim = connected_sim();
        let margin = sim
            .calc_margin(
                OrderSide::Buy,
                "EURUSD",
                rust_decimal_macros::dec!(0.1),
                rust_decimal_macros::dec!(1.10),
            )
            .await
            .unwrap();
        // 0.1 lot * 100_000 * 1.10 / 100
        assert_eq!(margin, rust_decimal_macros::dec!(110.00));
    }

    #[tokio::test]
    async fn profit_sign_follows_side() {
        let sim = connected_sim();
        let volume = rust_decimal_macros::dec!(0.02);
        let open = rust_decimal_macros::dec!(70000);
        let close = rust_decimal_macros::dec!(71000);
        let long = sim
            .calc_profit(OrderSide::Buy, "BTCUSD", volume, open, close)
            .await
            .unwrap();
        let short = sim
            .calc_profit(OrderSide::Sell, "BTCUSD", volume, open, close)
            .await
            .unwrap();
        assert!(long > Decimal::ZERO);
        assert_eq!(long, -short);
    }
}
