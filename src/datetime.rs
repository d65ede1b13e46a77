//! Date/time register block and calendar conversion for the SD2405 RTC.
//!
//! The SD2405 stores date and time in 7 consecutive BCD registers:
//! - Seconds, Minutes, Hours, Weekday, Day, Month, Year
//!
//! [`DateTimeFields`] is the decoded, host-visible view of those registers.
//! The year is kept as an offset from 2000 and the weekday runs 1-7 with
//! Sunday = 1. [`SD2405DateTime`] is the raw 7-byte block that travels over
//! the bus; both directions walk the same [`REGISTER_MAP`] so reading and
//! writing stay symmetric.
//!
//! # Error Handling
//!
//! Conversion errors are reported via [`SD2405DateTimeError`].

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::bcd::{bcd_to_decimal, decimal_to_bcd, is_bcd};
use crate::{Hours, RegAddr, TimeRepresentation};

/// Calendar year that a year register value of 0 stands for.
pub const EPOCH_YEAR: i32 = 2000;

/// Number of date/time registers transferred per read or write.
pub const DATETIME_REGISTER_COUNT: usize = 7;

/// Added to the hour before encoding; sets the 24-hour bit of the register.
const TWENTY_FOUR_HOUR_OFFSET: u8 = 80;

/// Mask that strips the display mode bit from a raw hour byte.
const HOUR_VALUE_MASK: u8 = 0x7F;

/// One calendar field of the date/time register block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    /// Seconds (0-59)
    Seconds,
    /// Minutes (0-59)
    Minutes,
    /// Hours (0-23)
    Hours,
    /// Day of week (1-7, Sunday = 1)
    Weekday,
    /// Day of month (1-31)
    Day,
    /// Month (1-12)
    Month,
    /// Years since 2000 (0-99)
    Year,
}

impl Field {
    /// Inclusive range of values the field accepts.
    pub const fn range(self) -> (u8, u8) {
        match self {
            Field::Seconds | Field::Minutes => (0, 59),
            Field::Hours => (0, 23),
            Field::Weekday => (1, 7),
            Field::Day => (1, 31),
            Field::Month => (1, 12),
            Field::Year => (0, 99),
        }
    }

    fn check(self, value: u8) -> Result<u8, SD2405DateTimeError> {
        let (min, max) = self.range();
        if (min..=max).contains(&value) {
            Ok(value)
        } else {
            Err(SD2405DateTimeError::FieldOutOfRange(self))
        }
    }

    fn encode(self, value: u8) -> u8 {
        match self {
            // pins the chip into 24-hour mode
            Field::Hours => decimal_to_bcd(value + TWENTY_FOUR_HOUR_OFFSET),
            _ => decimal_to_bcd(value),
        }
    }

    fn decode(self, byte: u8) -> Result<u8, SD2405DateTimeError> {
        match self {
            Field::Hours => decode_hours(Hours(byte)),
            _ if is_bcd(byte) => self.check(bcd_to_decimal(byte)),
            _ => Err(SD2405DateTimeError::FieldOutOfRange(self)),
        }
    }
}

/// Register address of each calendar field, in bus order.
pub const REGISTER_MAP: [(RegAddr, Field); DATETIME_REGISTER_COUNT] = [
    (RegAddr::Seconds, Field::Seconds),
    (RegAddr::Minutes, Field::Minutes),
    (RegAddr::Hours, Field::Hours),
    (RegAddr::Weekday, Field::Weekday),
    (RegAddr::Date, Field::Day),
    (RegAddr::Month, Field::Month),
    (RegAddr::Year, Field::Year),
];

fn decode_hours(hours: Hours) -> Result<u8, SD2405DateTimeError> {
    match hours.time_representation() {
        TimeRepresentation::TwentyFourHour => {
            let byte = u8::from(hours) & HOUR_VALUE_MASK;
            if !is_bcd(byte) {
                return Err(SD2405DateTimeError::FieldOutOfRange(Field::Hours));
            }
            Field::Hours.check(bcd_to_decimal(byte))
        }
        TimeRepresentation::TwelveHour => {
            let hour12 = 10 * hours.ten_hours() + hours.hours();
            if hours.reserved() || hours.hours() > 9 || !(1..=12).contains(&hour12) {
                return Err(SD2405DateTimeError::FieldOutOfRange(Field::Hours));
            }
            let is_pm = hours.pm_or_twenty_hours() != 0;
            Ok(match (hour12, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            })
        }
    }
}

/// Decoded contents of the date/time registers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTimeFields {
    /// Seconds (0-59)
    pub seconds: u8,
    /// Minutes (0-59)
    pub minutes: u8,
    /// Hours (0-23)
    pub hours: u8,
    /// Day of week (1-7, Sunday = 1)
    pub weekday: u8,
    /// Day of month (1-31)
    pub day: u8,
    /// Month (1-12)
    pub month: u8,
    /// Years since 2000 (0-99)
    pub year: u8,
}

impl DateTimeFields {
    /// Returns the value of a single field.
    pub fn get(&self, field: Field) -> u8 {
        match field {
            Field::Seconds => self.seconds,
            Field::Minutes => self.minutes,
            Field::Hours => self.hours,
            Field::Weekday => self.weekday,
            Field::Day => self.day,
            Field::Month => self.month,
            Field::Year => self.year,
        }
    }

    /// Sets the value of a single field without validation.
    pub fn set(&mut self, field: Field, value: u8) {
        let slot = match field {
            Field::Seconds => &mut self.seconds,
            Field::Minutes => &mut self.minutes,
            Field::Hours => &mut self.hours,
            Field::Weekday => &mut self.weekday,
            Field::Day => &mut self.day,
            Field::Month => &mut self.month,
            Field::Year => &mut self.year,
        };
        *slot = value;
    }

    /// Checks that every field is within the range the chip can store.
    ///
    /// # Errors
    /// Returns [`SD2405DateTimeError::FieldOutOfRange`] for the first field,
    /// in register order, that is out of range.
    pub fn validate(&self) -> Result<(), SD2405DateTimeError> {
        for (_, field) in REGISTER_MAP {
            field.check(self.get(field))?;
        }
        Ok(())
    }

    /// Decodes a raw date/time register block (registers 0x00-0x06).
    ///
    /// The display mode bit of the hour register never reaches the result.
    ///
    /// # Errors
    /// Returns [`SD2405DateTimeError::ShortRead`] when `data` holds fewer than
    /// 7 bytes and [`SD2405DateTimeError::FieldOutOfRange`] for bytes that are
    /// not valid BCD for their field.
    pub fn from_registers(data: &[u8]) -> Result<Self, SD2405DateTimeError> {
        SD2405DateTime::try_from(data)?.into_fields()
    }

    /// Encodes the fields into the register block the chip expects, with the
    /// hour pinned to 24-hour mode.
    pub fn to_registers(&self) -> Result<[u8; DATETIME_REGISTER_COUNT], SD2405DateTimeError> {
        let raw = SD2405DateTime::from_fields(self)?;
        Ok((&raw).into())
    }

    /// Breaks a calendar date/time into register fields.
    ///
    /// # Errors
    /// Years outside 2000-2099 cannot be stored.
    pub fn from_datetime(datetime: &NaiveDateTime) -> Result<Self, SD2405DateTimeError> {
        let year = datetime.year();
        if year < EPOCH_YEAR {
            error!("Year {} is too early! must be greater than 1999", year);
            return Err(SD2405DateTimeError::YearNotAfter1999);
        }
        if year > EPOCH_YEAR + 99 {
            error!("Year {} is too late! must be before 2100", year);
            return Err(SD2405DateTimeError::YearNotBefore2100);
        }
        let narrow = |v: u32| u8::try_from(v).map_err(|_| SD2405DateTimeError::InvalidDateTime);
        let fields = DateTimeFields {
            seconds: narrow(datetime.second())?,
            minutes: narrow(datetime.minute())?,
            hours: narrow(datetime.hour())?,
            weekday: narrow(datetime.weekday().number_from_sunday())?,
            day: narrow(datetime.day())?,
            month: narrow(datetime.month())?,
            year: u8::try_from(year - EPOCH_YEAR)
                .map_err(|_| SD2405DateTimeError::InvalidDateTime)?,
        };
        fields.validate()?;
        Ok(fields)
    }

    /// Composes the fields into a calendar date/time.
    ///
    /// The weekday is not consulted; chrono derives it from the date.
    ///
    /// # Errors
    /// Returns [`SD2405DateTimeError::InvalidDateTime`] for dates that do not
    /// exist (e.g. February 30th).
    pub fn to_datetime(&self) -> Result<NaiveDateTime, SD2405DateTimeError> {
        self.validate()?;
        let datetime = NaiveDate::from_ymd_opt(
            EPOCH_YEAR + i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
        .and_then(|d| {
            d.and_hms_opt(
                u32::from(self.hours),
                u32::from(self.minutes),
                u32::from(self.seconds),
            )
        })
        .ok_or(SD2405DateTimeError::InvalidDateTime)?;
        if datetime.weekday().number_from_sunday() != u32::from(self.weekday) {
            debug!(
                "weekday register {} disagrees with calendar date {}",
                self.weekday,
                datetime.weekday().number_from_sunday()
            );
        }
        Ok(datetime)
    }
}

/// Raw contents of the 7 date/time registers, as transferred on the bus.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct SD2405DateTime {
    registers: [u8; DATETIME_REGISTER_COUNT],
}

impl SD2405DateTime {
    /// Encodes validated fields into register bytes.
    pub(crate) fn from_fields(fields: &DateTimeFields) -> Result<Self, SD2405DateTimeError> {
        fields.validate()?;
        let mut registers = [0; DATETIME_REGISTER_COUNT];
        for (addr, field) in REGISTER_MAP {
            registers[addr as usize] = field.encode(fields.get(field));
        }
        let raw = SD2405DateTime { registers };
        debug!("raw={:?}", raw);
        Ok(raw)
    }

    /// Decodes the register bytes, dropping the hour display mode bit.
    pub(crate) fn into_fields(self) -> Result<DateTimeFields, SD2405DateTimeError> {
        debug!("raw={:?} hours={:?}", self, self.hours());
        let mut fields = DateTimeFields::default();
        for (addr, field) in REGISTER_MAP {
            fields.set(field, field.decode(self.registers[addr as usize])?);
        }
        Ok(fields)
    }

    pub(crate) fn hours(&self) -> Hours {
        Hours(self.registers[RegAddr::Hours as usize])
    }
}

impl From<[u8; DATETIME_REGISTER_COUNT]> for SD2405DateTime {
    fn from(registers: [u8; DATETIME_REGISTER_COUNT]) -> Self {
        SD2405DateTime { registers }
    }
}

impl TryFrom<&[u8]> for SD2405DateTime {
    type Error = SD2405DateTimeError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let registers = data
            .get(..DATETIME_REGISTER_COUNT)
            .and_then(|block| <[u8; DATETIME_REGISTER_COUNT]>::try_from(block).ok())
            .ok_or(SD2405DateTimeError::ShortRead {
                expected: DATETIME_REGISTER_COUNT,
                actual: data.len(),
            })?;
        Ok(SD2405DateTime { registers })
    }
}

impl From<&SD2405DateTime> for [u8; DATETIME_REGISTER_COUNT] {
    fn from(dt: &SD2405DateTime) -> [u8; DATETIME_REGISTER_COUNT] {
        dt.registers
    }
}

#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors that can occur during SD2405 date/time conversion or validation.
pub enum SD2405DateTimeError {
    /// Fewer register bytes arrived than the block requires
    ShortRead {
        /// Bytes required
        expected: usize,
        /// Bytes received
        actual: usize,
    },
    /// A field value cannot round-trip through its BCD register
    FieldOutOfRange(Field),
    /// The fields do not form a real calendar date/time
    InvalidDateTime,
    /// The year is not after 1999 (the SD2405 stores years from 2000)
    YearNotAfter1999,
    /// The year is not before 2100 (the SD2405 stores two year digits)
    YearNotBefore2100,
}
