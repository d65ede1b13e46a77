//! Register definitions and bitfield structures for the SD2405 RTC.
//!
//! This module contains the register addresses used by the driver and the
//! bitfield views of the time, write-protect and trimming registers.

use bitfield::bitfield;

/// Register addresses for the SD2405 RTC.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Seconds register (0-59)
    Seconds = 0x00,
    /// Minutes register (0-59)
    Minutes = 0x01,
    /// Hours register (0-23, bit 7 selects 24-hour mode)
    Hours = 0x02,
    /// Day of week register (1-7)
    Weekday = 0x03,
    /// Day of month register (1-31)
    Date = 0x04,
    /// Month register (1-12)
    Month = 0x05,
    /// Year register (0-99, offset from 2000)
    Year = 0x06,
    /// Control register 1, holds WRTC2 and WRTC3
    Ctr1 = 0x0F,
    /// Control register 2, holds WRTC1
    Ctr2 = 0x10,
    /// Time trimming register
    TimeTrim = 0x12,
}

/// Hour display mode selected by bit 7 of the hours register.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeRepresentation {
    /// 12-hour format (1-12 + AM/PM)
    TwelveHour = 0,
    /// 24-hour format (0-23)
    TwentyFourHour = 1,
}
impl From<u8> for TimeRepresentation {
    /// Creates a `TimeRepresentation` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => TimeRepresentation::TwelveHour,
            1 => TimeRepresentation::TwentyFourHour,
            _ => panic!("Invalid value for TimeRepresentation: {}", v),
        }
    }
}
impl From<TimeRepresentation> for u8 {
    fn from(v: TimeRepresentation) -> Self {
        v as u8
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Hours register with display mode selection and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    /// Display mode (12/24 hour)
    pub from into TimeRepresentation, time_representation, set_time_representation: 7, 7;
    /// Unused, reads back as zero
    pub reserved, set_reserved: 6;
    /// PM flag (12-hour) or 20-hour bit (24-hour)
    pub pm_or_twenty_hours, set_pm_or_twenty_hours: 5, 5;
    /// Tens place of hours
    pub ten_hours, set_ten_hours: 4, 4;
    /// Ones place of hours
    pub hours, set_hours: 3, 0;
}
from_register_u8!(Hours);

#[cfg(feature = "defmt")]
impl defmt::Format for Hours {
    fn format(&self, f: defmt::Formatter) {
        let hours = 10 * self.ten_hours() + self.hours();
        match self.time_representation() {
            TimeRepresentation::TwentyFourHour => {
                let hours = hours + 20 * self.pm_or_twenty_hours();
                defmt::write!(f, "Hours({}h 24h)", hours);
            }
            TimeRepresentation::TwelveHour => {
                let is_pm = self.pm_or_twenty_hours() != 0;
                defmt::write!(f, "Hours({}h {})", hours, if is_pm { "PM" } else { "AM" });
            }
        }
    }
}

bitfield! {
    /// Control register 1 (0x0F).
    ///
    /// Time registers only accept writes while WRTC1, WRTC2 and WRTC3 are
    /// all set.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Ctr1(u8);
    impl Debug;
    /// Write enable bit 3
    pub wrtc3, set_wrtc3: 7;
    /// Write enable bit 2
    pub wrtc2, set_wrtc2: 2;
}
from_register_u8!(Ctr1);

bitfield! {
    /// Control register 2 (0x10).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Ctr2(u8);
    impl Debug;
    /// Write enable bit 1
    pub wrtc1, set_wrtc1: 7;
}
from_register_u8!(Ctr2);

bitfield! {
    /// Time trimming register (0x12).
    ///
    /// The counter is left untouched when the adjustment is zero.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct TimeTrim(u8);
    impl Debug;
    /// Oscillator adjustment (F6-F0)
    pub adjustment, set_adjustment: 6, 0;
}
from_register_u8!(TimeTrim);

impl Ctr1 {
    /// Value written while unlocking: WRTC2 and WRTC3 set.
    pub(crate) fn unlocked() -> Self {
        let mut value = Self::default();
        value.set_wrtc2(true);
        value.set_wrtc3(true);
        value
    }
}

impl TimeTrim {
    /// Value that leaves the oscillator counter unadjusted.
    pub(crate) fn neutral() -> Self {
        let mut value = Self::default();
        value.set_adjustment(0);
        value
    }
}

impl Ctr2 {
    /// Value written while unlocking: WRTC1 set.
    pub(crate) fn unlocked() -> Self {
        let mut value = Self::default();
        value.set_wrtc1(true);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_register_conversions() {
        // 14:00 as written by the driver (24-hour bit forced)
        let hours = Hours::from(0x94);
        assert_eq!(
            hours.time_representation(),
            TimeRepresentation::TwentyFourHour
        );
        assert_eq!(hours.pm_or_twenty_hours(), 0);
        assert_eq!(hours.ten_hours(), 1);
        assert_eq!(hours.hours(), 4);
        assert_eq!(u8::from(hours), 0x94);

        // 23:00 in 24-hour mode
        let hours = Hours::from(0xA3);
        assert_eq!(
            hours.time_representation(),
            TimeRepresentation::TwentyFourHour
        );
        assert_eq!(hours.pm_or_twenty_hours(), 1);
        assert_eq!(hours.ten_hours(), 0);
        assert_eq!(hours.hours(), 3);

        // 12-hour mode, 11 PM
        let hours = Hours::from(0x31);
        assert_eq!(hours.time_representation(), TimeRepresentation::TwelveHour);
        assert_eq!(hours.pm_or_twenty_hours(), 1);
        assert_eq!(hours.ten_hours(), 1);
        assert_eq!(hours.hours(), 1);
        assert!(!hours.reserved());
        assert!(Hours::from(0x42).reserved());
    }

    #[test]
    fn test_write_protect_unlock_values() {
        assert_eq!(u8::from(Ctr1::unlocked()), 0x84);
        assert_eq!(u8::from(Ctr2::unlocked()), 0x80);
        assert_eq!(u8::from(Ctr1::default()), 0x00);
        assert_eq!(u8::from(Ctr2::default()), 0x00);

        let ctr1 = Ctr1::from(0x84);
        assert!(ctr1.wrtc2());
        assert!(ctr1.wrtc3());
        assert!(Ctr2::from(0x80).wrtc1());
    }

    #[test]
    fn test_time_trim_default_is_neutral() {
        let trim = TimeTrim::neutral();
        assert_eq!(trim.adjustment(), 0);
        assert_eq!(u8::from(trim), 0x00);

        // a neutral write clears a previously programmed adjustment
        let mut trim = TimeTrim::from(0x7F);
        assert_eq!(trim.adjustment(), 0x7F);
        trim.set_adjustment(0);
        assert_eq!(trim, TimeTrim::neutral());
    }

    #[test]
    fn test_time_representation_conversions() {
        assert_eq!(
            TimeRepresentation::from(1),
            TimeRepresentation::TwentyFourHour
        );
        assert_eq!(TimeRepresentation::from(0), TimeRepresentation::TwelveHour);
        assert_eq!(u8::from(TimeRepresentation::TwentyFourHour), 1);
    }

    #[test]
    #[should_panic(expected = "Invalid value for TimeRepresentation: 2")]
    fn test_invalid_time_representation_conversion() {
        let _ = TimeRepresentation::from(2);
    }
}
