use regex::Captures;
use time::{Date, Month, PrimitiveDateTime, Time};

/// Three-letter English month abbreviation, any case.
fn month(abbreviation: &str) -> Option<Month> {
    let month = match abbreviation.to_ascii_lowercase().as_str() {
        "jan" => Month::January,
        "feb" => Month::February,
        "mar" => Month::March,
        "apr" => Month::April,
        "may" => Month::May,
        "jun" => Month::June,
        "jul" => Month::July,
        "aug" => Month::August,
        "sep" => Month::September,
        "oct" => Month::October,
        "nov" => Month::November,
        "dec" => Month::December,
        _ => return None,
    };
    Some(month)
}

/// Same pivot as `strptime`'s `%y`: 69-99 are the 1900s, 00-68 the 2000s.
pub(crate) fn expand_year(year: i32) -> i32 {
    match year {
        0..=68 => 2000 + year,
        69..=99 => 1900 + year,
        _ => year,
    }
}

/// Builds a date-time from the named groups `year`, `month`, `day`, `hour`,
/// `minute` and `second`. Returns `None` for impossible dates.
pub(crate) fn from_captures(captures: &Captures<'_>) -> Option<PrimitiveDateTime> {
    let number = |group: &str| captures.name(group)?.as_str().parse::<u8>().ok();
    let year = captures.name("year")?.as_str();
    let year = match year.len() {
        2 => expand_year(year.parse().ok()?),
        _ => year.parse().ok()?,
    };
    let date = Date::from_calendar_date(year, month(captures.name("month")?.as_str())?, number("day")?).ok()?;
    let time = Time::from_hms(number("hour")?, number("minute")?, number("second")?).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAT_START_TIME_REGEX;
    use rstest::rstest;

    #[rstest]
    #[case(0, 2000)]
    #[case(17, 2017)]
    #[case(68, 2068)]
    #[case(69, 1969)]
    #[case(99, 1999)]
    fn test_expand_year(#[case] short: i32, #[case] full: i32) {
        assert_eq!(expand_year(short), full);
    }

    #[rstest]
    #[case("08-Mar-17-14:02:11", Some((2017, Month::March, 8, 14, 2, 11)))]
    #[case("08-mar-17-140211", Some((2017, Month::March, 8, 14, 2, 11)))]
    #[case("31-Dec-99-23:59:59", Some((1999, Month::December, 31, 23, 59, 59)))]
    #[case("31-Feb-17-14:02:11", None)]
    #[case("08-Foo-17-14:02:11", None)]
    #[case("08-Mar-17-25:02:11", None)]
    fn test_from_captures(#[case] input: &str, #[case] expected: Option<(i32, Month, u8, u8, u8, u8)>) {
        let captures = MAT_START_TIME_REGEX.captures(input).unwrap();
        let expected = expected.map(|(y, mo, d, h, mi, s)| {
            PrimitiveDateTime::new(
                Date::from_calendar_date(y, mo, d).unwrap(),
                Time::from_hms(h, mi, s).unwrap(),
            )
        });
        assert_eq!(from_captures(&captures), expected);
    }
}
