// crates/nlu/src/temporal.rs
//
// Relative/absolute date expression resolution. Rules are evaluated in a
// fixed order because later rules would misfire on text consumed by earlier
// ones: weekend, relative day, month-qualified day, bare day-of-month,
// next-N-days, explicit dates, then the today default.

use chrono::{DateTime, Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use pipa_core::TemporalQuery;
use regex::Regex;
use tracing::debug;

/// One parsing rule. `matches` is a cheap pre-test; `apply` may still decline
/// (malformed components), in which case resolution continues down the chain.
pub trait TemporalRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, text: &str) -> bool;
    fn apply(&self, text: &str, now: DateTime<Tz>) -> Option<TemporalQuery>;
}

pub struct TemporalResolver {
    rules: Vec<Box<dyn TemporalRule>>,
}

impl TemporalResolver {
    pub fn new(max_range_days: i64) -> Self {
        let max = max_range_days.max(1);
        let rules: Vec<Box<dyn TemporalRule>> = vec![
            Box::new(WeekendRule),
            Box::new(RelativeDayRule),
            Box::new(MonthQualifiedDayRule::new()),
            Box::new(BareDayRule::new()),
            Box::new(NextNDaysRule::new(max)),
            Box::new(ExplicitDateRule::new(max)),
        ];
        Self { rules }
    }

    /// `now` is always caller-supplied; the resolver never reads the wall
    /// clock. No temporal pattern matching is not an error: the safe default
    /// is today.
    pub fn resolve(&self, text: &str, now: DateTime<Tz>) -> TemporalQuery {
        for rule in &self.rules {
            if rule.matches(text) {
                if let Some(query) = rule.apply(text, now) {
                    debug!(rule = rule.name(), "Temporal rule matched");
                    return query;
                }
            }
        }
        TemporalQuery::single(now.date_naive(), 0, "今天")
    }
}

struct WeekendRule;

impl TemporalRule for WeekendRule {
    fn name(&self) -> &'static str {
        "weekend"
    }

    fn matches(&self, text: &str) -> bool {
        text.contains("周末") || text.contains("weekend")
    }

    fn apply(&self, text: &str, now: DateTime<Tz>) -> Option<TemporalQuery> {
        let today = now.date_naive();
        // Monday-anchored week start; if now falls on Sat/Sun this still
        // selects the pair containing now.
        let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);

        let next = text.contains("下周末")
            || text.contains("next weekend")
            || ((text.contains("下周") || text.contains("下星期")) && text.contains("周末"));

        let saturday = monday + Duration::days(if next { 12 } else { 5 });
        let label = if next { "下周末" } else { "这个周末" };
        Some(TemporalQuery::range(
            saturday,
            saturday + Duration::days(1),
            label,
        ))
    }
}

struct RelativeDayRule;

impl TemporalRule for RelativeDayRule {
    fn name(&self) -> &'static str {
        "relative_day"
    }

    fn matches(&self, text: &str) -> bool {
        ["后天", "明天", "今天", "tomorrow", "today"]
            .iter()
            .any(|kw| text.contains(kw))
    }

    fn apply(&self, text: &str, now: DateTime<Tz>) -> Option<TemporalQuery> {
        let (offset, label) = if text.contains("后天") {
            (2, "后天")
        } else if text.contains("明天") || text.contains("tomorrow") {
            (1, "明天")
        } else {
            (0, "今天")
        };
        let date = now.date_naive() + Duration::days(offset);
        Some(TemporalQuery::single(date, offset, label))
    }
}

struct MonthQualifiedDayRule {
    re: Regex,
}

impl MonthQualifiedDayRule {
    fn new() -> Self {
        Self {
            re: Regex::new(r"(下个月|下月|本月|这个月)\s*([0-9一二三四五六七八九十两]{1,3})\s*[号日]")
                .expect("month-qualified day pattern"),
        }
    }
}

impl TemporalRule for MonthQualifiedDayRule {
    fn name(&self) -> &'static str {
        "month_qualified_day"
    }

    fn matches(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    fn apply(&self, text: &str, now: DateTime<Tz>) -> Option<TemporalQuery> {
        let today = now.date_naive();
        let caps = self.re.captures(text)?;
        let day = parse_day_number(caps.get(2)?.as_str())?;

        let (year, month) = if caps.get(1)?.as_str().starts_with('下') {
            next_month(today.year(), today.month())
        } else {
            (today.year(), today.month())
        };

        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let offset = (date - today).num_days();
        Some(TemporalQuery::single(
            date,
            offset,
            caps.get(0)?.as_str().to_string(),
        ))
    }
}

struct BareDayRule {
    re: Regex,
}

impl BareDayRule {
    fn new() -> Self {
        Self {
            re: Regex::new(r"([0-9一二三四五六七八九十两]{1,3})\s*[号日]")
                .expect("bare day pattern"),
        }
    }
}

impl TemporalRule for BareDayRule {
    fn name(&self) -> &'static str {
        "bare_day_of_month"
    }

    fn matches(&self, text: &str) -> bool {
        // A bare "N号" only; month- or week-qualified text belongs to other
        // rules.
        self.re.is_match(text)
            && !text.contains('月')
            && !text.contains('周')
            && !text.contains("星期")
            && !text.contains("week")
    }

    fn apply(&self, text: &str, now: DateTime<Tz>) -> Option<TemporalQuery> {
        let today = now.date_naive();
        let caps = self.re.captures(text)?;
        let day = parse_day_number(caps.get(1)?.as_str())?;

        // "You must mean the next occurrence": a day already past this month
        // resolves into the following month.
        let (year, month) = if day >= today.day() {
            (today.year(), today.month())
        } else {
            next_month(today.year(), today.month())
        };

        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let offset = (date - today).num_days();
        Some(TemporalQuery::single(
            date,
            offset,
            caps.get(0)?.as_str().trim().to_string(),
        ))
    }
}

struct NextNDaysRule {
    cn_re: Regex,
    en_re: Regex,
    max_days: i64,
}

impl NextNDaysRule {
    fn new(max_days: i64) -> Self {
        Self {
            cn_re: Regex::new(r"(?:接下来|未来|今后)的?([0-9一二三四五六七八九十两]{1,3})\s*天")
                .expect("next-n-days pattern"),
            en_re: Regex::new(r"next\s+(\d{1,2})\s+days?").expect("english next-n-days pattern"),
            max_days,
        }
    }
}

impl TemporalRule for NextNDaysRule {
    fn name(&self) -> &'static str {
        "next_n_days"
    }

    fn matches(&self, text: &str) -> bool {
        self.cn_re.is_match(text) || self.en_re.is_match(text)
    }

    fn apply(&self, text: &str, now: DateTime<Tz>) -> Option<TemporalQuery> {
        let (raw, english) = match self.cn_re.captures(text) {
            Some(caps) => (caps.get(1)?.as_str().to_string(), false),
            None => {
                let caps = self.en_re.captures(text)?;
                (caps.get(1)?.as_str().to_string(), true)
            }
        };

        let n = i64::from(parse_count(&raw)?).clamp(1, self.max_days);

        // Today is excluded: the range starts tomorrow.
        let start = now.date_naive() + Duration::days(1);
        let end = start + Duration::days(n - 1);
        let label = if english {
            format!("next {} days", n)
        } else {
            format!("接下来{}天", n)
        };
        Some(TemporalQuery::range(start, end, label))
    }
}

struct ExplicitDateRule {
    ymd_re: Regex,
    dmy_re: Regex,
    cn_re: Regex,
    max_days: i64,
}

impl ExplicitDateRule {
    fn new(max_days: i64) -> Self {
        Self {
            ymd_re: Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("ymd pattern"),
            dmy_re: Regex::new(r"(\d{1,2})-(\d{1,2})-(\d{4})").expect("dmy pattern"),
            cn_re: Regex::new(r"(?:(\d{4})年)?(\d{1,2})月(\d{1,2})[日号]").expect("cn date pattern"),
            max_days,
        }
    }

    /// All recognizable dates with their byte spans, in text order. Later
    /// patterns skip spans already claimed by an earlier one.
    fn find_dates(&self, text: &str, today: NaiveDate) -> Vec<(usize, usize, NaiveDate)> {
        let mut found: Vec<(usize, usize, NaiveDate)> = Vec::new();

        for caps in self.ymd_re.captures_iter(text) {
            let m = caps.get(0).unwrap();
            if let Some(date) = build_date(&caps[1], &caps[2], &caps[3]) {
                found.push((m.start(), m.end(), date));
            }
        }

        for caps in self.dmy_re.captures_iter(text) {
            let m = caps.get(0).unwrap();
            if overlaps(&found, m.start(), m.end()) {
                continue;
            }
            if let Some(date) = build_date(&caps[3], &caps[2], &caps[1]) {
                found.push((m.start(), m.end(), date));
            }
        }

        for caps in self.cn_re.captures_iter(text) {
            let m = caps.get(0).unwrap();
            if overlaps(&found, m.start(), m.end()) {
                continue;
            }
            let year = caps
                .get(1)
                .map(|y| y.as_str().to_string())
                .unwrap_or_else(|| today.year().to_string());
            if let Some(date) = build_date(&year, &caps[2], &caps[3]) {
                found.push((m.start(), m.end(), date));
            }
        }

        found.sort_by_key(|(start, _, _)| *start);
        found
    }
}

impl TemporalRule for ExplicitDateRule {
    fn name(&self) -> &'static str {
        "explicit_date"
    }

    fn matches(&self, text: &str) -> bool {
        self.ymd_re.is_match(text) || self.dmy_re.is_match(text) || self.cn_re.is_match(text)
    }

    fn apply(&self, text: &str, now: DateTime<Tz>) -> Option<TemporalQuery> {
        let today = now.date_naive();
        let dates = self.find_dates(text, today);

        if dates.len() >= 2 {
            let (_, first_end, first) = dates[0];
            let (second_start, _, second) = dates[1];
            let between = &text[first_end..second_start];
            if ["到", "至", "~", "-"].iter().any(|c| between.contains(c)) {
                let (mut start, mut end) = (first, second);
                if end < start {
                    std::mem::swap(&mut start, &mut end);
                }
                // Clamp by truncating the end date.
                if (end - start).num_days() + 1 > self.max_days {
                    end = start + Duration::days(self.max_days - 1);
                }
                let label = format!("{}到{}", cn_date(start), cn_date(end));
                return Some(TemporalQuery::range(start, end, label));
            }
        }

        let (_, _, date) = *dates.first()?;
        let offset = (date - today).num_days();
        let label = if date == today {
            "今天".to_string()
        } else {
            cn_date(date)
        };
        Some(TemporalQuery::single(date, offset, label))
    }
}

fn overlaps(found: &[(usize, usize, NaiveDate)], start: usize, end: usize) -> bool {
    found.iter().any(|(s, e, _)| start < *e && end > *s)
}

fn build_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )
}

fn cn_date(date: NaiveDate) -> String {
    format!("{}月{}日", date.month(), date.day())
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn parse_day_number(raw: &str) -> Option<u32> {
    let n = parse_count(raw)?;
    (1..=31).contains(&n).then_some(n)
}

/// Digits or simple Chinese numerals up to 99 ("三", "十", "二十一", "两").
fn parse_count(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return (n > 0).then_some(n);
    }

    fn digit(ch: char) -> Option<u32> {
        match ch {
            '一' => Some(1),
            '二' | '两' => Some(2),
            '三' => Some(3),
            '四' => Some(4),
            '五' => Some(5),
            '六' => Some(6),
            '七' => Some(7),
            '八' => Some(8),
            '九' => Some(9),
            _ => None,
        }
    }

    let chars: Vec<char> = raw.chars().collect();
    let value = match chars.as_slice() {
        [c] if *c == '十' => Some(10),
        [c] => digit(*c),
        ['十', ones] => Some(10 + digit(*ones)?),
        [tens, '十'] => Some(digit(*tens)? * 10),
        [tens, '十', ones] => Some(digit(*tens)? * 10 + digit(*ones)?),
        _ => None,
    }?;
    (value > 0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    const TZ: Tz = chrono_tz::Australia::Melbourne;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Tz> {
        TZ.with_ymd_and_hms(y, m, d, 9, 0, 0).single().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolver() -> TemporalResolver {
        TemporalResolver::new(5)
    }

    #[test]
    fn tomorrow_resolves_to_plus_one() {
        let q = resolver().resolve("明天", at(2025, 3, 10));
        assert_eq!(
            q,
            TemporalQuery::single(date(2025, 3, 11), 1, "明天")
        );
    }

    #[test]
    fn day_after_tomorrow_resolves_to_plus_two() {
        let q = resolver().resolve("后天有什么安排吗", at(2025, 3, 10));
        assert_eq!(q.start(), date(2025, 3, 12));
        assert_eq!(q.label(), "后天");
    }

    #[test]
    fn this_weekend_from_a_monday() {
        let q = resolver().resolve("这个周末", at(2025, 3, 10));
        assert_eq!(q.start(), date(2025, 3, 15));
        assert_eq!(q.end(), date(2025, 3, 16));
    }

    #[test]
    fn weekend_pair_contains_a_saturday_now() {
        let q = resolver().resolve("周末", at(2025, 3, 15));
        assert_eq!(q.start(), date(2025, 3, 15));
        assert_eq!(q.end(), date(2025, 3, 16));
    }

    #[test]
    fn next_weekend_is_exactly_seven_days_later() {
        let q = resolver().resolve("下周末", at(2025, 3, 10));
        assert_eq!(q.start(), date(2025, 3, 22));
        assert_eq!(q.end(), date(2025, 3, 23));
    }

    #[test]
    fn bare_day_before_today_rolls_to_next_month() {
        let q = resolver().resolve("3号", at(2025, 3, 10));
        assert_eq!(q.start(), date(2025, 4, 3));
    }

    #[test]
    fn bare_day_at_or_after_today_stays_in_month() {
        let q = resolver().resolve("25号有空吗", at(2025, 3, 10));
        assert_eq!(q.start(), date(2025, 3, 25));
        assert_eq!(q.label(), "25号");
    }

    #[test]
    fn bare_day_december_rolls_into_next_year() {
        let q = resolver().resolve("3号", at(2025, 12, 10));
        assert_eq!(q.start(), date(2026, 1, 3));
    }

    #[test]
    fn month_qualified_day_next_month() {
        let q = resolver().resolve("下个月3号", at(2025, 3, 10));
        assert_eq!(q.start(), date(2025, 4, 3));
    }

    #[test]
    fn month_qualified_day_this_month() {
        let q = resolver().resolve("本月15号", at(2025, 3, 10));
        assert_eq!(q.start(), date(2025, 3, 15));
    }

    #[test]
    fn next_n_days_excludes_today() {
        let q = resolver().resolve("接下来5天", at(2025, 3, 10));
        assert_eq!(q.start(), date(2025, 3, 11));
        assert_eq!(q.end(), date(2025, 3, 15));
        assert_eq!(q.days(), 5);
    }

    #[test]
    fn next_n_days_accepts_chinese_numerals() {
        let q = resolver().resolve("未来三天天气", at(2025, 3, 10));
        assert_eq!(q.days(), 3);
    }

    #[test]
    fn range_length_is_clamped_to_maximum() {
        let q = resolver().resolve("接下来10天", at(2025, 3, 10));
        assert_eq!(q.days(), 5);

        let q = resolver().resolve("next 9 days", at(2025, 3, 10));
        assert_eq!(q.days(), 5);
    }

    #[test]
    fn explicit_iso_range() {
        let q = resolver().resolve("2025-01-01到2025-01-03", at(2025, 6, 1));
        assert_eq!(q.start(), date(2025, 1, 1));
        assert_eq!(q.end(), date(2025, 1, 3));
        assert_eq!(q.days(), 3);
    }

    #[test]
    fn explicit_range_swaps_reversed_bounds() {
        let q = resolver().resolve("2025-01-05到2025-01-03", at(2025, 6, 1));
        assert_eq!(q.start(), date(2025, 1, 3));
        assert_eq!(q.end(), date(2025, 1, 5));
    }

    #[test]
    fn explicit_range_truncates_end_past_maximum() {
        let q = resolver().resolve("2025-01-01到2025-01-20", at(2025, 6, 1));
        assert_eq!(q.end(), date(2025, 1, 5));
    }

    #[test]
    fn chinese_date_forms_resolve() {
        let q = resolver().resolve("3月5日的天气", at(2025, 3, 10));
        assert_eq!(q.start(), date(2025, 3, 5));
        assert_eq!(q.label(), "3月5日");

        let q = resolver().resolve("2025年1月1日到2025年1月3日", at(2025, 6, 1));
        assert_eq!(q.days(), 3);
    }

    #[test]
    fn explicit_date_equal_to_today_is_labelled_today() {
        let q = resolver().resolve("2025-03-10", at(2025, 3, 10));
        assert_eq!(q.label(), "今天");
    }

    #[test]
    fn unmatched_text_defaults_to_today() {
        let q = resolver().resolve("天气怎么样", at(2025, 3, 10));
        assert_eq!(
            q,
            TemporalQuery::single(date(2025, 3, 10), 0, "今天")
        );
    }

    #[test]
    fn relative_day_wins_over_bare_day() {
        // "明天" and "3号" both present; earlier rule takes priority.
        let q = resolver().resolve("明天3号的安排", at(2025, 3, 10));
        assert_eq!(q.start(), date(2025, 3, 11));
    }

    #[test]
    fn weekend_wins_over_day_of_month() {
        let q = resolver().resolve("周末2号有事吗", at(2025, 3, 10));
        assert!(matches!(q, TemporalQuery::Range { .. }));
    }

    #[test]
    fn invalid_day_component_falls_through_to_default() {
        let q = resolver().resolve("45号", at(2025, 3, 10));
        assert_eq!(q.start(), date(2025, 3, 10));
        assert_eq!(q.label(), "今天");
    }

    #[test]
    fn chinese_numeral_parser_handles_compounds() {
        assert_eq!(parse_count("三"), Some(3));
        assert_eq!(parse_count("十"), Some(10));
        assert_eq!(parse_count("十五"), Some(15));
        assert_eq!(parse_count("二十"), Some(20));
        assert_eq!(parse_count("二十一"), Some(21));
        assert_eq!(parse_count("两"), Some(2));
        assert_eq!(parse_count("号"), None);
    }
}
