use crate::time::{Delta, Time};

macro_rules! unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Sum,
            derive_more::Display,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const ZERO: $name = Self::new(0);
            pub const ONE: $name = Self::new(1);
            pub const MAX: $name = Self::new(u64::MAX);

            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn into_u64(self) -> u64 {
                self.0
            }

            pub const fn into_f64(self) -> f64 {
                self.0 as f64
            }

            pub fn scale_by(self, val: f64) -> Self {
                let inner = self.0 as f64 * val;
                Self(inner.round() as u64)
            }
        }
    };
}

unit!(Nanosecs);
unit!(Microsecs);
unit!(Millisecs);
unit!(Secs);

impl Nanosecs {
    pub fn into_time(self) -> Time {
        Time::new(u128::from(self.0))
    }

    pub fn into_delta(self) -> Delta {
        Delta::new(u128::from(self.0))
    }
}

impl Microsecs {
    pub const fn into_ns(self) -> Nanosecs {
        Nanosecs::new(self.0 * 1_000)
    }

    pub fn into_time(self) -> Time {
        self.into_ns().into_time()
    }

    pub fn into_delta(self) -> Delta {
        self.into_ns().into_delta()
    }
}

impl Millisecs {
    pub const fn into_us(self) -> Microsecs {
        Microsecs::new(self.0 * 1_000)
    }

    pub const fn into_ns(self) -> Nanosecs {
        self.into_us().into_ns()
    }

    pub fn into_time(self) -> Time {
        self.into_us().into_time()
    }

    pub fn into_delta(self) -> Delta {
        self.into_us().into_delta()
    }
}

impl Secs {
    pub const fn into_ms(self) -> Millisecs {
        Millisecs::new(self.0 * 1_000)
    }

    pub const fn into_ns(self) -> Nanosecs {
        self.into_ms().into_ns()
    }

    pub fn into_time(self) -> Time {
        self.into_ms().into_time()
    }

    pub fn into_delta(self) -> Delta {
        self.into_ms().into_delta()
    }
}

impl From<Microsecs> for Nanosecs {
    fn from(us: Microsecs) -> Self {
        us.into_ns()
    }
}

impl From<Millisecs> for Nanosecs {
    fn from(ms: Millisecs) -> Self {
        ms.into_ns()
    }
}

impl From<Secs> for Nanosecs {
    fn from(s: Secs) -> Self {
        s.into_ns()
    }
}

impl From<Nanosecs> for Time {
    fn from(ns: Nanosecs) -> Self {
        ns.into_time()
    }
}

impl From<Microsecs> for Time {
    fn from(us: Microsecs) -> Self {
        us.into_time()
    }
}

impl From<Millisecs> for Time {
    fn from(ms: Millisecs) -> Self {
        ms.into_time()
    }
}

impl From<Secs> for Time {
    fn from(s: Secs) -> Self {
        s.into_time()
    }
}

unit!(Bits);

unit!(BitsPerSec);
unit!(Kbps);
unit!(Mbps);

impl BitsPerSec {
    /// Serialization time of `size` bits at this rate, rounded to the nearest nanosecond.
    pub fn transmit(&self, size: Bits) -> Nanosecs {
        assert!(*self != BitsPerSec::ZERO);
        if size == Bits::ZERO {
            return Nanosecs::ZERO;
        }
        let bits = size.into_f64();
        let bps = self.into_f64();
        let delta = (bits * 1e9) / bps;
        Nanosecs::new(delta.round() as u64)
    }
}

impl Kbps {
    pub const fn into_bps(self) -> BitsPerSec {
        BitsPerSec::new(self.0 * 1_000)
    }
}

impl Mbps {
    pub const fn into_bps(self) -> BitsPerSec {
        BitsPerSec::new(self.0 * 1_000_000)
    }
}

impl From<Kbps> for BitsPerSec {
    fn from(val: Kbps) -> Self {
        val.into_bps()
    }
}

impl From<Mbps> for BitsPerSec {
    fn from(val: Mbps) -> Self {
        val.into_bps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmit_at_100_mbps() {
        // A maximum-size Ethernet frame
        let rate = Mbps::new(100).into_bps();
        assert_eq!(rate.transmit(Bits::new(12_144)), Nanosecs::new(121_440));
    }

    #[test]
    fn transmit_rounds_to_nearest_ns() {
        let rate = Kbps::new(125).into_bps();
        // 108 bits at 125 kbit/s is 864 us exactly; 1 bit is 8 us
        assert_eq!(rate.transmit(Bits::new(108)), Microsecs::new(864).into_ns());
        let rate = BitsPerSec::new(3);
        assert_eq!(rate.transmit(Bits::ONE), Nanosecs::new(333_333_333));
    }

    #[test]
    fn zero_bits_is_instant() {
        let rate = Mbps::new(10).into_bps();
        assert_eq!(rate.transmit(Bits::ZERO), Nanosecs::ZERO);
    }
}
