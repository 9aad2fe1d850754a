//! Network tuning values.
//!
//! Defaults match the shipped device defs. A settings file is plain JSON;
//! missing fields fall back to the defaults.

use serde::{Deserialize, Serialize};

/// Longest delay a settings file may ask for, in ticks
pub const MAX_DELAY_TICKS: u64 = 1_000_000;

/// Tunable parameters for the detonation network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Max ticks a wireless adjacency list is reused before a rescan
    pub recache_interval_ticks: u64,
    /// Gap between consecutive wireless deliveries
    pub wireless_step_delay_ticks: u64,
    /// Delay added per wired step for newly laid conductors
    pub wired_delay_per_step: f32,
    /// Flood fill stops past this many steps
    pub max_signal_steps: u32,
    /// Channels are numbered 1..=channel_count
    pub channel_count: u32,
    /// Failure chance of a fully soaked conductor
    pub wet_failure_chance: f32,
    /// Chance a failed conductor starts a fire
    pub wet_fire_chance: f32,
    /// Wetness lost per tick
    pub wetness_dry_rate: f32,
    /// Wick burn time of a charge
    pub wick_ticks: u64,
    /// Minimum gap between automatic sensor triggers
    pub sensor_cooldown_ticks: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            recache_interval_ticks: 120,
            wireless_step_delay_ticks: 6,
            wired_delay_per_step: 1.0,
            max_signal_steps: 4096,
            channel_count: 3,
            wet_failure_chance: 0.15,
            wet_fire_chance: 0.5,
            wetness_dry_rate: 0.0005,
            wick_ticks: 120,
            sensor_cooldown_ticks: 300,
        }
    }
}

impl NetworkSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from JSON and clamp them into range
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let settings: NetworkSettings = serde_json::from_str(json)?;
        Ok(settings.validated())
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Clamp out-of-range values, warning about each one
    pub fn validated(mut self) -> Self {
        if self.channel_count == 0 {
            log::warn!("channel_count must be at least 1, using 1");
            self.channel_count = 1;
        }
        if self.max_signal_steps == 0 {
            log::warn!("max_signal_steps is 0, wired signals will not propagate");
        }
        if !(self.wired_delay_per_step.is_finite() && self.wired_delay_per_step >= 0.0) {
            log::warn!(
                "wired_delay_per_step {} is invalid, using 0",
                self.wired_delay_per_step
            );
            self.wired_delay_per_step = 0.0;
        }
        for (name, value) in [
            ("wet_failure_chance", &mut self.wet_failure_chance),
            ("wet_fire_chance", &mut self.wet_fire_chance),
        ] {
            if !(0.0..=1.0).contains(&*value) {
                log::warn!("{} {} out of range, clamping to 0..=1", name, value);
                *value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
            }
        }
        if !(self.wetness_dry_rate.is_finite() && self.wetness_dry_rate >= 0.0) {
            log::warn!("wetness_dry_rate {} is invalid, using 0", self.wetness_dry_rate);
            self.wetness_dry_rate = 0.0;
        }
        for (name, value) in [
            ("wireless_step_delay_ticks", &mut self.wireless_step_delay_ticks),
            ("wick_ticks", &mut self.wick_ticks),
        ] {
            if *value > MAX_DELAY_TICKS {
                log::warn!("{} {} too large, using {}", name, value, MAX_DELAY_TICKS);
                *value = MAX_DELAY_TICKS;
            }
        }
        self
    }

    /// Clamp a requested channel into 1..=channel_count
    pub fn clamp_channel(&self, channel: u32) -> u32 {
        channel.clamp(1, self.channel_count.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let s = NetworkSettings::from_json_str(r#"{ "channel_count": 5 }"#).unwrap();
        assert_eq!(s.channel_count, 5);
        assert_eq!(s.wick_ticks, NetworkSettings::default().wick_ticks);
    }

    #[test]
    fn test_validation_clamps() {
        let s = NetworkSettings::from_json_str(
            r#"{ "channel_count": 0, "wet_failure_chance": 3.0, "wired_delay_per_step": -1.0 }"#,
        )
        .unwrap();
        assert_eq!(s.channel_count, 1);
        assert_eq!(s.wet_failure_chance, 1.0);
        assert_eq!(s.wired_delay_per_step, 0.0);
    }

    #[test]
    fn test_delays_capped() {
        let json = format!(
            r#"{{ "wireless_step_delay_ticks": {}, "wick_ticks": {} }}"#,
            u64::MAX,
            MAX_DELAY_TICKS + 1
        );
        let s = NetworkSettings::from_json_str(&json).unwrap();
        assert_eq!(s.wireless_step_delay_ticks, MAX_DELAY_TICKS);
        assert_eq!(s.wick_ticks, MAX_DELAY_TICKS);
        assert_eq!(s.clone().validated(), s);
    }

    #[test]
    fn test_clamp_channel() {
        let s = NetworkSettings::default();
        assert_eq!(s.clamp_channel(0), 1);
        assert_eq!(s.clamp_channel(2), 2);
        assert_eq!(s.clamp_channel(9), 3);
    }

    #[test]
    fn test_json_roundtrip() {
        let s = NetworkSettings::default();
        let json = s.to_json_string().unwrap();
        assert_eq!(NetworkSettings::from_json_str(&json).unwrap(), s);
    }
}
