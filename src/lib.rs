//! A platform-agnostic driver for the SD2405 real-time clock.
//!
//! The SD2405 is a battery-backed I2C RTC that keeps date and time in seven
//! BCD registers. Its time registers are write-protected: every write must be
//! bracketed by setting and clearing the WRTC1/WRTC2/WRTC3 flags. This driver
//! performs that bracket, pins the chip into 24-hour mode on every write and
//! neutralizes the time trimming register so the freshly set time does not
//! drift.
//!
//! # Features
//!
//! - `async`: adds [`asynch::SD2405`] on top of `embedded-hal-async`
//! - `log`: debug/error logging through the `log` crate
//! - `defmt`: debug/error logging and `defmt::Format` derives through `defmt`
//!
//! # Example
//!
//! ```rust,ignore
//! use sd2405::{SD2405, DEFAULT_ADDRESS};
//!
//! let mut rtc = SD2405::new(i2c, DEFAULT_ADDRESS);
//! rtc.set_timestamp(1_718_375_445)?;
//! let now = rtc.datetime()?;
//! ```
//!
//! # Sharing
//!
//! The chip has a single register pointer shared by every transaction, so
//! operations take `&mut self` and never interleave. To use one chip from
//! several contexts, wrap the driver in a mutex and hold it for the whole
//! call.

#![no_std]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        macro_rules! debug {
            ($($arg:tt)*) => { defmt::debug!($($arg)*) };
        }
        macro_rules! error {
            ($($arg:tt)*) => { defmt::error!($($arg)*) };
        }
    } else if #[cfg(feature = "log")] {
        macro_rules! debug {
            ($($arg:tt)*) => { log::debug!($($arg)*) };
        }
        macro_rules! error {
            ($($arg:tt)*) => { log::error!($($arg)*) };
        }
    } else {
        macro_rules! debug {
            ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
        }
        macro_rules! error {
            ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
        }
    }
}

#[cfg(feature = "async")]
pub mod asynch;
pub mod bcd;
pub mod datetime;
mod registers;

use chrono::{DateTime, NaiveDateTime, Utc};
use embedded_hal::i2c::I2c;
use paste::paste;

pub use crate::datetime::{
    DateTimeFields, Field, SD2405DateTimeError, DATETIME_REGISTER_COUNT, EPOCH_YEAR,
    REGISTER_MAP,
};
use crate::datetime::SD2405DateTime;
pub use crate::registers::*;

/// Fixed I2C address of the SD2405.
pub const DEFAULT_ADDRESS: u8 = 0x32;

/// Errors returned by the SD2405 driver.
#[derive(Debug)]
pub enum SD2405Error<I2CE> {
    /// The I2C transport failed
    I2c(I2CE),
    /// The register block or calendar value could not be converted
    DateTime(SD2405DateTimeError),
}

impl<I2CE> From<I2CE> for SD2405Error<I2CE> {
    fn from(e: I2CE) -> Self {
        SD2405Error::I2c(e)
    }
}

/// Converts a Unix timestamp (UTC seconds) into a calendar date/time.
pub(crate) fn timestamp_to_datetime(timestamp: i64) -> Result<NaiveDateTime, SD2405DateTimeError> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.naive_utc())
        .ok_or(SD2405DateTimeError::InvalidDateTime)
}

/// SD2405 Real-Time Clock driver.
pub struct SD2405<I2C: I2c> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> SD2405<I2C> {
    /// Creates a new SD2405 driver instance.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus implementation
    /// * `address` - The I2C address of the device (normally [`DEFAULT_ADDRESS`])
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Destroys the driver and returns the I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_raw_datetime(&mut self) -> Result<DateTimeFields, SD2405Error<I2C::Error>> {
        let mut data = [0; DATETIME_REGISTER_COUNT];
        self.i2c
            .write_read(self.address, &[RegAddr::Seconds as u8], &mut data)?;
        DateTimeFields::from_registers(&data).map_err(SD2405Error::DateTime)
    }

    fn write_raw_datetime(&mut self, raw: &SD2405DateTime) -> Result<(), SD2405Error<I2C::Error>> {
        let data: [u8; DATETIME_REGISTER_COUNT] = raw.into();
        let mut frame = [0; DATETIME_REGISTER_COUNT + 1];
        frame[0] = RegAddr::Seconds as u8;
        frame[1..].copy_from_slice(&data);
        self.i2c.write(self.address, &frame)?;
        Ok(())
    }

    /// Sets WRTC1, then WRTC2 and WRTC3, unlocking the time registers.
    fn write_enable(&mut self) -> Result<(), SD2405Error<I2C::Error>> {
        self.set_ctr2(Ctr2::unlocked())?;
        self.set_ctr1(Ctr1::unlocked())
    }

    /// Clears the write-protect flags. The pointer auto-increments from CTR1
    /// into CTR2, so one frame clears WRTC2/WRTC3 and then WRTC1.
    fn write_disable(&mut self) -> Result<(), SD2405Error<I2C::Error>> {
        self.i2c.write(
            self.address,
            &[
                RegAddr::Ctr1 as u8,
                Ctr1::default().into(),
                Ctr2::default().into(),
            ],
        )?;
        Ok(())
    }

    fn clear_time_trim(&mut self) -> Result<(), SD2405Error<I2C::Error>> {
        self.set_time_trim(TimeTrim::neutral())
    }

    /// Reads the current date/time registers.
    ///
    /// # Returns
    /// * `Ok(DateTimeFields)` - The decoded fields, hour always 0-23
    /// * `Err(SD2405Error)` on bus failure or malformed register contents
    pub fn fields(&mut self) -> Result<DateTimeFields, SD2405Error<I2C::Error>> {
        let fields = self.read_raw_datetime()?;
        debug!("SD2405: read {:?}", fields);
        Ok(fields)
    }

    /// Writes the date/time registers.
    ///
    /// The fields are validated before any bus traffic. The write is wrapped
    /// in the write-enable/write-disable bracket and followed by clearing the
    /// time trimming register. If any step after unlocking fails, the chip is
    /// still relocked and the first error is returned.
    pub fn set_fields(&mut self, fields: &DateTimeFields) -> Result<(), SD2405Error<I2C::Error>> {
        let raw = SD2405DateTime::from_fields(fields).map_err(SD2405Error::DateTime)?;
        let written = self
            .write_enable()
            .and_then(|()| self.write_raw_datetime(&raw))
            .and_then(|()| self.clear_time_trim());
        if written.is_err() {
            error!("SD2405: time write failed, relocking");
        }
        let locked = self.write_disable();
        written.and(locked)
    }

    /// Gets the current date and time from the device.
    pub fn datetime(&mut self) -> Result<NaiveDateTime, SD2405Error<I2C::Error>> {
        self.fields()?.to_datetime().map_err(SD2405Error::DateTime)
    }

    /// Sets the current date and time on the device.
    ///
    /// Only years 2000-2099 can be stored.
    pub fn set_datetime(&mut self, datetime: &NaiveDateTime) -> Result<(), SD2405Error<I2C::Error>> {
        let fields = DateTimeFields::from_datetime(datetime).map_err(SD2405Error::DateTime)?;
        self.set_fields(&fields)
    }

    /// Gets the current time as a Unix timestamp (UTC seconds).
    pub fn timestamp(&mut self) -> Result<i64, SD2405Error<I2C::Error>> {
        Ok(self.datetime()?.and_utc().timestamp())
    }

    /// Sets the current time from a Unix timestamp (UTC seconds).
    pub fn set_timestamp(&mut self, timestamp: i64) -> Result<(), SD2405Error<I2C::Error>> {
        let datetime = timestamp_to_datetime(timestamp).map_err(SD2405Error::DateTime)?;
        self.set_datetime(&datetime)
    }
}

// Single register writes used by the write-protect bracket
macro_rules! impl_register_write {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<I2C: I2c> SD2405<I2C> {
            $(
                paste! {
                    fn [<set_ $name>](&mut self, value: $typ) -> Result<(), SD2405Error<I2C::Error>> {
                        self.i2c.write(self.address, &[$regaddr as u8, value.into()])?;
                        Ok(())
                    }
                }
            )+
        }
    };
}

impl_register_write!(
    (ctr1, RegAddr::Ctr1, Ctr1),
    (ctr2, RegAddr::Ctr2, Ctr2),
    (time_trim, RegAddr::TimeTrim, TimeTrim)
);
