//! Text form of TimeSpan values: `[-][d.]hh:mm:ss[.ffffff]`.

use chrono::Duration;
use eyre::{ensure, Result, WrapErr};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;
const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

pub fn timespan_micros(span: &Duration) -> i64 {
    span.num_microseconds().unwrap_or(if *span < Duration::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}

pub fn format_timespan(span: &Duration) -> String {
    let micros = timespan_micros(span);
    let sign = if micros < 0 { "-" } else { "" };
    let mut rest = micros.unsigned_abs();

    let days = rest / MICROS_PER_DAY as u64;
    rest %= MICROS_PER_DAY as u64;
    let hours = rest / MICROS_PER_HOUR as u64;
    rest %= MICROS_PER_HOUR as u64;
    let minutes = rest / MICROS_PER_MINUTE as u64;
    rest %= MICROS_PER_MINUTE as u64;
    let seconds = rest / MICROS_PER_SECOND as u64;
    let fraction = rest % MICROS_PER_SECOND as u64;

    let mut out = String::with_capacity(24);
    out.push_str(sign);
    if days > 0 {
        out.push_str(&format!("{}.", days));
    }
    out.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if fraction > 0 {
        out.push_str(&format!(".{:06}", fraction));
    }
    out
}

pub fn parse_timespan(text: &str) -> Result<Duration> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let parts: Vec<&str> = body.split(':').collect();
    ensure!(parts.len() == 3, "invalid timespan '{}'", text);

    let (days, hours) = match parts[0].split_once('.') {
        Some((d, h)) => (parse_component(d, text)?, parse_component(h, text)?),
        None => (0, parse_component(parts[0], text)?),
    };
    let minutes = parse_component(parts[1], text)?;
    let (seconds, fraction) = match parts[2].split_once('.') {
        Some((s, f)) => {
            ensure!(
                !f.is_empty() && f.len() <= 6 && f.bytes().all(|b| b.is_ascii_digit()),
                "invalid timespan fraction in '{}'",
                text
            );
            let scaled = format!("{:0<6}", f);
            (parse_component(s, text)?, parse_component(&scaled, text)?)
        }
        None => (parse_component(parts[2], text)?, 0),
    };
    ensure!(
        hours < 24 && minutes < 60 && seconds < 60,
        "timespan component out of range in '{}'",
        text
    );

    let total = days
        .checked_mul(MICROS_PER_DAY)
        .and_then(|v| v.checked_add(hours * MICROS_PER_HOUR))
        .and_then(|v| v.checked_add(minutes * MICROS_PER_MINUTE))
        .and_then(|v| v.checked_add(seconds * MICROS_PER_SECOND))
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(|| eyre::eyre!("timespan '{}' overflows", text))?;

    Ok(Duration::microseconds(if negative { -total } else { total }))
}

fn parse_component(part: &str, whole: &str) -> Result<i64> {
    ensure!(
        !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()),
        "invalid timespan '{}'",
        whole
    );
    part.parse::<i64>()
        .wrap_err_with(|| format!("invalid timespan '{}'", whole))
}
