//! Async implementation of the SD2405 driver.
//!
//! This module provides an async interface to the SD2405 RTC device using
//! `embedded-hal-async` traits. It is only available when the `async` feature
//! is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use sd2405::asynch::SD2405;
//!
//! let mut rtc = SD2405::new(i2c, sd2405::DEFAULT_ADDRESS);
//! rtc.set_datetime(&datetime).await?;
//! let datetime = rtc.datetime().await?;
//! ```

use chrono::NaiveDateTime;
use embedded_hal_async::i2c::I2c;
use paste::paste;

use crate::datetime::SD2405DateTime;
use crate::{
    timestamp_to_datetime, Ctr1, Ctr2, DateTimeFields, RegAddr, SD2405Error, TimeTrim,
    DATETIME_REGISTER_COUNT,
};

/// SD2405 Real-Time Clock async driver.
///
/// Same register protocol as [`crate::SD2405`], over `embedded-hal-async`.
pub struct SD2405<I2C: I2c> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> SD2405<I2C> {
    /// Creates a new SD2405 async driver instance.
    ///
    /// # Arguments
    /// * `i2c` - The async I2C bus implementation
    /// * `address` - The I2C address of the device (normally 0x32)
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Destroys the driver and returns the I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    async fn read_raw_datetime(&mut self) -> Result<DateTimeFields, SD2405Error<I2C::Error>> {
        let mut data = [0; DATETIME_REGISTER_COUNT];
        self.i2c
            .write_read(self.address, &[RegAddr::Seconds as u8], &mut data)
            .await?;
        DateTimeFields::from_registers(&data).map_err(SD2405Error::DateTime)
    }

    async fn write_raw_datetime(
        &mut self,
        raw: &SD2405DateTime,
    ) -> Result<(), SD2405Error<I2C::Error>> {
        let data: [u8; DATETIME_REGISTER_COUNT] = raw.into();
        let mut frame = [0; DATETIME_REGISTER_COUNT + 1];
        frame[0] = RegAddr::Seconds as u8;
        frame[1..].copy_from_slice(&data);
        self.i2c.write(self.address, &frame).await?;
        Ok(())
    }

    async fn write_enable(&mut self) -> Result<(), SD2405Error<I2C::Error>> {
        self.set_ctr2(Ctr2::unlocked()).await?;
        self.set_ctr1(Ctr1::unlocked()).await
    }

    async fn write_disable(&mut self) -> Result<(), SD2405Error<I2C::Error>> {
        self.i2c
            .write(
                self.address,
                &[
                    RegAddr::Ctr1 as u8,
                    Ctr1::default().into(),
                    Ctr2::default().into(),
                ],
            )
            .await?;
        Ok(())
    }

    /// Unlocks, writes the time block, clears trimming. Stops at the first
    /// failure.
    async fn write_unlocked(&mut self, raw: &SD2405DateTime) -> Result<(), SD2405Error<I2C::Error>> {
        self.write_enable().await?;
        self.write_raw_datetime(raw).await?;
        self.set_time_trim(TimeTrim::neutral()).await
    }

    /// Reads the current date/time registers.
    pub async fn fields(&mut self) -> Result<DateTimeFields, SD2405Error<I2C::Error>> {
        let fields = self.read_raw_datetime().await?;
        debug!("SD2405: read {:?}", fields);
        Ok(fields)
    }

    /// Writes the date/time registers inside the write-protect bracket.
    ///
    /// See [`crate::SD2405::set_fields`].
    pub async fn set_fields(
        &mut self,
        fields: &DateTimeFields,
    ) -> Result<(), SD2405Error<I2C::Error>> {
        let raw = SD2405DateTime::from_fields(fields).map_err(SD2405Error::DateTime)?;
        let written = self.write_unlocked(&raw).await;
        if written.is_err() {
            error!("SD2405: time write failed, relocking");
        }
        let locked = self.write_disable().await;
        written.and(locked)
    }

    /// Gets the current date and time from the device.
    pub async fn datetime(&mut self) -> Result<NaiveDateTime, SD2405Error<I2C::Error>> {
        self.fields()
            .await?
            .to_datetime()
            .map_err(SD2405Error::DateTime)
    }

    /// Sets the current date and time on the device.
    pub async fn set_datetime(
        &mut self,
        datetime: &NaiveDateTime,
    ) -> Result<(), SD2405Error<I2C::Error>> {
        let fields = DateTimeFields::from_datetime(datetime).map_err(SD2405Error::DateTime)?;
        self.set_fields(&fields).await
    }

    /// Gets the current time as a Unix timestamp (UTC seconds).
    pub async fn timestamp(&mut self) -> Result<i64, SD2405Error<I2C::Error>> {
        Ok(self.datetime().await?.and_utc().timestamp())
    }

    /// Sets the current time from a Unix timestamp (UTC seconds).
    pub async fn set_timestamp(&mut self, timestamp: i64) -> Result<(), SD2405Error<I2C::Error>> {
        let datetime = timestamp_to_datetime(timestamp).map_err(SD2405Error::DateTime)?;
        self.set_datetime(&datetime).await
    }
}

// Register access implementations
macro_rules! impl_register_write {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<I2C: I2c> SD2405<I2C> {
            $(
                paste! {
                    async fn [<set_ $name>](&mut self, value: $typ) -> Result<(), SD2405Error<I2C::Error>> {
                        self.i2c.write(
                            self.address,
                            &[$regaddr as u8, value.into()],
                        ).await?;
                        Ok(())
                    }
                }
            )+
        }
    }
}

impl_register_write!(
    (ctr1, RegAddr::Ctr1, Ctr1),
    (ctr2, RegAddr::Ctr2, Ctr2),
    (time_trim, RegAddr::TimeTrim, TimeTrim)
);

#[cfg(test)]
mod tests {
    extern crate alloc;
    use super::*;
    use crate::{Field, SD2405DateTimeError};
    use alloc::vec;
    use chrono::{Datelike, NaiveDate, Timelike};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

    const DEVICE_ADDRESS: u8 = 0x32;

    async fn setup_mock(expectations: &[I2cTrans]) -> I2cMock {
        I2cMock::new(expectations)
    }

    #[tokio::test]
    async fn test_async_set_datetime() {
        // Thursday
        let dt = NaiveDate::from_ymd_opt(2024, 3, 14)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap();

        let mock = setup_mock(&[
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Ctr2 as u8, 0x80]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Ctr1 as u8, 0x84]),
            I2cTrans::write(
                DEVICE_ADDRESS,
                vec![
                    RegAddr::Seconds as u8,
                    0x00, // seconds
                    0x30, // minutes
                    0x95, // hours (15 with the 24-hour bit)
                    0x05, // weekday (Thursday, Sunday = 1)
                    0x14, // day
                    0x03, // month
                    0x24, // year
                ],
            ),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::TimeTrim as u8, 0x00]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Ctr1 as u8, 0x00, 0x00]),
        ])
        .await;
        let mut dev = SD2405::new(mock, DEVICE_ADDRESS);

        dev.set_datetime(&dt).await.unwrap();
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_async_read_datetime() {
        let mock = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            vec![0x00, 0x30, 0x95, 0x05, 0x14, 0x03, 0x24],
        )])
        .await;
        let mut dev = SD2405::new(mock, DEVICE_ADDRESS);

        let dt = dev.datetime().await.unwrap();
        assert_eq!(dt.hour(), 15);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.second(), 0);
        assert_eq!(dt.day(), 14);
        assert_eq!(dt.month(), 3);
        assert_eq!(dt.year(), 2024);
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_async_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(14, 30, 45)
            .unwrap()
            .and_utc()
            .timestamp();
        let mock = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            vec![0x45, 0x30, 0x94, 0x01, 0x15, 0x06, 0x25],
        )])
        .await;
        let mut dev = SD2405::new(mock, DEVICE_ADDRESS);

        assert_eq!(dev.timestamp().await.unwrap(), expected);
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_async_failed_write_relocks() {
        let mock = setup_mock(&[
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Ctr2 as u8, 0x80]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Ctr1 as u8, 0x84])
                .with_error(ErrorKind::Other),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Ctr1 as u8, 0x00, 0x00]),
        ])
        .await;
        let mut dev = SD2405::new(mock, DEVICE_ADDRESS);

        let fields = DateTimeFields {
            seconds: 0,
            minutes: 0,
            hours: 0,
            weekday: 1,
            day: 1,
            month: 1,
            year: 0,
        };
        let err = dev.set_fields(&fields).await.unwrap_err();
        assert!(matches!(err, SD2405Error::I2c(ErrorKind::Other)));
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_async_out_of_range_rejected() {
        let mock = setup_mock(&[]).await;
        let mut dev = SD2405::new(mock, DEVICE_ADDRESS);

        let fields = DateTimeFields {
            seconds: 0,
            minutes: 0,
            hours: 24,
            weekday: 1,
            day: 1,
            month: 1,
            year: 0,
        };
        let err = dev.set_fields(&fields).await.unwrap_err();
        assert!(matches!(
            err,
            SD2405Error::DateTime(SD2405DateTimeError::FieldOutOfRange(Field::Hours))
        ));
        dev.i2c.done();
    }
}
