// Temporal values are plain integers counted from an epoch in some unit:
//
//   DATE           i32  days since 1970.01.01
//   MONTH          i32  year * 12 + (month - 1)
//   TIME           i32  milliseconds since midnight
//   MINUTE         i32  minutes since midnight
//   SECOND         i32  seconds since midnight
//   DATETIME       i32  seconds since 1970.01.01T00:00:00
//   DATEHOUR       i32  hours since 1970.01.01T00
//   TIMESTAMP      i64  milliseconds since epoch
//   NANOTIME       i64  nanoseconds since midnight
//   NANOTIMESTAMP  i64  nanoseconds since epoch
//
// Conversions between them go through nanoseconds (since epoch for the
// date-bearing types, since midnight for the clock types).

use crate::types::DataType;
use dolphin_base::{arg_err, overflow_err, parse_err, type_err, Result};

const NS_PER_US: i64 = 1_000;
const NS_PER_MS: i64 = 1_000_000;
const NS_PER_SEC: i64 = 1_000_000_000;
const NS_PER_MIN: i64 = 60 * NS_PER_SEC;
const NS_PER_HOUR: i64 = 60 * NS_PER_MIN;
const NS_PER_DAY: i64 = 24 * NS_PER_HOUR;

// Howard Hinnant's civil calendar algorithms.
pub fn days_from_civil(y: i64, m: u32, d: u32) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = m as i64;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + d as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

pub fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719468;
    let era = z.div_euclid(146097);
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = yoe + era * 400 + if m <= 2 { 1 } else { 0 };
    (y, m, d)
}

fn is_leap(y: i64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

fn days_in_month(y: i64, m: u32) -> u32 {
    match m {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(y) => 29,
        _ => 28,
    }
}

fn fmt_date(days: i64) -> String {
    let (y, m, d) = civil_from_days(days);
    format!("{:04}.{:02}.{:02}", y, m, d)
}

fn fmt_clock(ns_of_day: i64, frac_digits: u32) -> String {
    let h = ns_of_day / NS_PER_HOUR;
    let mi = ns_of_day / NS_PER_MIN % 60;
    let s = ns_of_day / NS_PER_SEC % 60;
    let frac = ns_of_day % NS_PER_SEC;
    match frac_digits {
        3 => format!("{:02}:{:02}:{:02}.{:03}", h, mi, s, frac / NS_PER_MS),
        9 => format!("{:02}:{:02}:{:02}.{:09}", h, mi, s, frac),
        _ => format!("{:02}:{:02}:{:02}", h, mi, s),
    }
}

/// Renders a non-null temporal raw value in the server's text format.
pub fn format(ty: DataType, raw: i64) -> String {
    match ty {
        DataType::Date => fmt_date(raw),
        DataType::Month => {
            let y = raw.div_euclid(12);
            let m = raw.rem_euclid(12) + 1;
            format!("{:04}.{:02}M", y, m)
        }
        DataType::Time => fmt_clock(raw * NS_PER_MS, 3),
        DataType::Minute => format!("{:02}:{:02}m", raw / 60, raw % 60),
        DataType::Second => fmt_clock(raw * NS_PER_SEC, 0),
        DataType::NanoTime => fmt_clock(raw, 9),
        DataType::DateTime => {
            let ns = raw * NS_PER_SEC;
            format!("{}T{}", fmt_date(ns.div_euclid(NS_PER_DAY)), fmt_clock(ns.rem_euclid(NS_PER_DAY), 0))
        }
        DataType::DateHour => {
            let days = raw.div_euclid(24);
            format!("{}T{:02}", fmt_date(days), raw.rem_euclid(24))
        }
        DataType::Timestamp => {
            let days = raw.div_euclid(86_400_000);
            let ms = raw.rem_euclid(86_400_000);
            format!("{}T{}", fmt_date(days), fmt_clock(ms * NS_PER_MS, 3))
        }
        DataType::NanoTimestamp => {
            format!("{}T{}", fmt_date(raw.div_euclid(NS_PER_DAY)), fmt_clock(raw.rem_euclid(NS_PER_DAY), 9))
        }
        _ => raw.to_string(),
    }
}

fn parse_date_part(s: &str) -> Option<i64> {
    let mut it = s.split(['.', '-', '/']);
    let y: i64 = it.next()?.trim().parse().ok()?;
    let m: u32 = it.next()?.trim().parse().ok()?;
    let d: u32 = it.next()?.trim().parse().ok()?;
    if it.next().is_some() || !(1..=12).contains(&m) || d == 0 || d > days_in_month(y, m) {
        return None;
    }
    Some(days_from_civil(y, m, d))
}

fn parse_clock_part(s: &str) -> Option<i64> {
    let s = s.strip_suffix('m').unwrap_or(s);
    let (hms, frac) = match s.split_once('.') {
        Some((a, b)) => (a, Some(b)),
        None => (s, None),
    };
    let parts: Vec<&str> = hms.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    let h: i64 = parts[0].parse().ok()?;
    let mi: i64 = parts[1].parse().ok()?;
    let sec: i64 = match parts.get(2) {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    if !(0..24).contains(&h) || !(0..60).contains(&mi) || !(0..60).contains(&sec) {
        return None;
    }
    let mut ns = h * NS_PER_HOUR + mi * NS_PER_MIN + sec * NS_PER_SEC;
    if let Some(frac) = frac {
        if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let digits: i64 = frac.parse().ok()?;
        ns += digits * 10_i64.pow(9 - frac.len() as u32);
    }
    Some(ns)
}

fn split_date_time(s: &str) -> Option<(&str, &str)> {
    s.split_once('T').or_else(|| s.split_once(' '))
}

/// Parses the text form of a temporal value into its raw integer. Empty
/// text is null; the caller maps `None` onto the storage sentinel.
pub fn parse(ty: DataType, s: &str) -> Result<Option<i64>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let bad = || parse_err(format!("cannot parse '{}' as {}", s, ty));
    let raw = match ty {
        DataType::Date => parse_date_part(s).ok_or_else(bad)?,
        DataType::Month => {
            let body = s.strip_suffix('M').unwrap_or(s);
            let (y, m) = body.split_once(['.', '-']).ok_or_else(bad)?;
            let y: i64 = y.parse().map_err(|_| bad())?;
            let m: i64 = m.parse().map_err(|_| bad())?;
            if !(1..=12).contains(&m) {
                return Err(bad());
            }
            y * 12 + m - 1
        }
        DataType::Time => parse_clock_part(s).ok_or_else(bad)? / NS_PER_MS,
        DataType::Minute => parse_clock_part(s).ok_or_else(bad)? / NS_PER_MIN,
        DataType::Second => parse_clock_part(s).ok_or_else(bad)? / NS_PER_SEC,
        DataType::NanoTime => parse_clock_part(s).ok_or_else(bad)?,
        DataType::DateHour => {
            let (d, h) = split_date_time(s).ok_or_else(bad)?;
            let days = parse_date_part(d).ok_or_else(bad)?;
            let h: i64 = h.parse().map_err(|_| bad())?;
            if !(0..24).contains(&h) {
                return Err(bad());
            }
            days * 24 + h
        }
        DataType::DateTime | DataType::Timestamp | DataType::NanoTimestamp => {
            let (days, ns) = match split_date_time(s) {
                Some((d, t)) => (
                    parse_date_part(d).ok_or_else(bad)?,
                    parse_clock_part(t).ok_or_else(bad)?,
                ),
                None => (parse_date_part(s).ok_or_else(bad)?, 0),
            };
            let total = days
                .checked_mul(NS_PER_DAY)
                .and_then(|d| d.checked_add(ns))
                .ok_or_else(|| overflow_err(format!("'{}' out of range for {}", s, ty)))?;
            match ty {
                DataType::DateTime => total.div_euclid(NS_PER_SEC),
                DataType::Timestamp => total.div_euclid(NS_PER_MS),
                _ => total,
            }
        }
        _ => return Err(type_err(format!("{} is not a temporal type", ty))),
    };
    Ok(Some(raw))
}

fn is_clock(ty: DataType) -> bool {
    matches!(ty, DataType::Time | DataType::Minute | DataType::Second | DataType::NanoTime)
}

fn to_nanos(ty: DataType, raw: i64) -> Option<i64> {
    match ty {
        DataType::Date => raw.checked_mul(NS_PER_DAY),
        DataType::Month => {
            let y = raw.div_euclid(12);
            let m = (raw.rem_euclid(12) + 1) as u32;
            days_from_civil(y, m, 1).checked_mul(NS_PER_DAY)
        }
        DataType::DateHour => raw.checked_mul(NS_PER_HOUR),
        DataType::DateTime | DataType::Second => raw.checked_mul(NS_PER_SEC),
        DataType::Timestamp | DataType::Time => raw.checked_mul(NS_PER_MS),
        DataType::Minute => raw.checked_mul(NS_PER_MIN),
        DataType::NanoTime | DataType::NanoTimestamp => Some(raw),
        _ => None,
    }
}

fn from_nanos(ty: DataType, ns: i64) -> i64 {
    match ty {
        DataType::Date => ns.div_euclid(NS_PER_DAY),
        DataType::Month => {
            let (y, m, _) = civil_from_days(ns.div_euclid(NS_PER_DAY));
            y * 12 + m as i64 - 1
        }
        DataType::DateHour => ns.div_euclid(NS_PER_HOUR),
        DataType::DateTime | DataType::Second => ns.div_euclid(NS_PER_SEC),
        DataType::Timestamp | DataType::Time => ns.div_euclid(NS_PER_MS),
        DataType::Minute => ns.div_euclid(NS_PER_MIN),
        _ => ns,
    }
}

/// Converts a non-null raw value between temporal types. Date-bearing types
/// convert into each other and can drop to a clock type (keeping the time of
/// day); a clock type cannot gain a date.
pub fn convert(from: DataType, to: DataType, raw: i64) -> Result<i64> {
    if from == to {
        return Ok(raw);
    }
    if !from.is_temporal() || !to.is_temporal() {
        return Err(type_err(format!("cannot convert {} to {}", from, to)));
    }
    if is_clock(from) && !is_clock(to) {
        return Err(type_err(format!("cannot convert {} to {}", from, to)));
    }
    let ns = to_nanos(from, raw)
        .ok_or_else(|| overflow_err(format!("{} value {} out of range", from, raw)))?;
    let ns = if is_clock(to) { ns.rem_euclid(NS_PER_DAY) } else { ns };
    let out = from_nanos(to, ns);
    if to.unit_len() == 4 && (out <= i32::MIN as i64 || out > i32::MAX as i64) {
        return Err(overflow_err(format!("{} value out of range for {}", from, to)));
    }
    Ok(out)
}

/// Microseconds are not a server unit but show up in client timestamps.
pub fn nanos_from_micros(us: i64) -> Result<i64> {
    us.checked_mul(NS_PER_US)
        .ok_or_else(|| arg_err(format!("{} microseconds out of range", us)))
}
