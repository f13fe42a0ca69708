//! Field extraction from the Bus Vision approach page
//!
//! The page is third-party markup that changes without notice, so nothing
//! here parses the document as a whole. Each field has its own
//! [`FieldProbe`]: one pattern, one capture. A probe that misses yields an
//! empty string (or a named default) for its field and nothing else.
//!
//! ```
//! use bus_approach_tracker::config::StopNames;
//! use bus_approach_tracker::extractor::extract_snapshot;
//!
//! let html = r#"<span id="updateTime">12:30</span>該当する接近情報はありません"#;
//! let snapshot = extract_snapshot(html, &StopNames::default());
//! assert!(!snapshot.has_data);
//! assert_eq!(snapshot.update_time, "12:30");
//! ```

use crate::{
    config::StopNames,
    constants::{NO_APPROACH_MARKER, UNKNOWN_UPDATE_TIME},
    types::ApproachSnapshot,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// A named pattern that captures one field's text
///
/// Capture group 1 is the field value. The value is trimmed only when the
/// probe is built with [`FieldProbe::trimmed`].
#[derive(Debug)]
pub struct FieldProbe {
    name: &'static str,
    pattern: Regex,
    trim: bool,
}

impl FieldProbe {
    /// Builds a probe from a pattern known to be valid
    fn fixed(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("field probe pattern is valid"),
            trim: false,
        }
    }

    fn trimmed(name: &'static str, pattern: &str) -> Self {
        Self {
            trim: true,
            ..Self::fixed(name, pattern)
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// First match of this probe in `haystack`
    pub fn probe(&self, haystack: &str) -> Option<String> {
        let value = self.pattern.captures(haystack)?.get(1)?.as_str();
        let value = if self.trim { value.trim() } else { value };
        Some(value.to_string())
    }

    /// First match, or an empty string
    pub fn probe_or_empty(&self, haystack: &str) -> String {
        self.probe(haystack).unwrap_or_default()
    }
}

// Document-level fields
pub static UPDATE_TIME: Lazy<FieldProbe> =
    Lazy::new(|| FieldProbe::fixed("update_time", r#"<span id="updateTime">([^<]+)</span>"#));
pub static STOP_FROM: Lazy<FieldProbe> = Lazy::new(|| {
    FieldProbe::fixed("stop_from", r#"<span id="stopNmFromTitle">([^<]+)</span>"#)
});
pub static STOP_TO: Lazy<FieldProbe> =
    Lazy::new(|| FieldProbe::fixed("stop_to", r#"<span id="stopNmToTitle">([^<]+)</span>"#));

// Record-level fields, probed inside the first record block only
pub static APPROACH: Lazy<FieldProbe> = Lazy::new(|| {
    FieldProbe::trimmed(
        "approach",
        r#"<div id="approachInfo" class="approachCaption">\s*([^<]+)\s*</div>"#,
    )
});
pub static ROUTE: Lazy<FieldProbe> =
    Lazy::new(|| FieldProbe::fixed("route", r#"<span id="routeNm">([^<]+)</span>"#));
pub static DESTINATION: Lazy<FieldProbe> =
    Lazy::new(|| FieldProbe::fixed("destination", r#"<span id="destNm"[^>]*>([^<]+)</span>"#));
pub static PASS_TIME: Lazy<FieldProbe> = Lazy::new(|| {
    FieldProbe::fixed(
        "pass_time",
        r#"<span id="passTimeInfo" class="passTimeInfo"[^>]*>([^<]+)</span>"#,
    )
});
pub static DELAY: Lazy<FieldProbe> = Lazy::new(|| {
    FieldProbe::fixed(
        "delay",
        r#"<span id="passInfo" class="passInfoText"[^>]*>([^<]+)</span>"#,
    )
});
pub static CURRENT_LOCATION: Lazy<FieldProbe> = Lazy::new(|| {
    FieldProbe::fixed(
        "current_location",
        r#"<span id="stopNmPass" class="detailStop"[^>]*>([^<]+)</span>"#,
    )
});
pub static RELATIVE_POSITION: Lazy<FieldProbe> = Lazy::new(|| {
    FieldProbe::fixed(
        "relative_position",
        r#"<span id="beforeFromInfo-pass" class="beforeFrom"[^>]*>([^<]+)</span>"#,
    )
});

/// One `approachData` container, closed by three consecutive `</div>`s
static RECORD_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div class="approachData">.*?</div>\s*</div>\s*</div>"#)
        .expect("record block pattern is valid")
});

/// Earliest record block in the page
pub fn first_record_block(html: &str) -> Option<&str> {
    RECORD_BLOCK.find(html).map(|m| m.as_str())
}

/// True unless the page says no bus is approaching
pub fn has_approach_data(html: &str) -> bool {
    !html.contains(NO_APPROACH_MARKER)
}

/// Record fields of the nearest bus
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BusRecord {
    approach: String,
    route: String,
    destination: String,
    pass_time: String,
    delay: String,
    current_location: String,
    relative_position: String,
}

impl BusRecord {
    fn from_block(block: &str) -> Self {
        Self {
            approach: APPROACH.probe_or_empty(block),
            route: ROUTE.probe_or_empty(block),
            destination: DESTINATION.probe_or_empty(block),
            pass_time: PASS_TIME.probe_or_empty(block),
            delay: DELAY.probe_or_empty(block),
            current_location: CURRENT_LOCATION.probe_or_empty(block),
            relative_position: RELATIVE_POSITION.probe_or_empty(block),
        }
    }
}

/// Extracts a snapshot from the approach page
///
/// Never fails: missing fields fall back to `defaults`, the unknown-time
/// sentinel or an empty string.
pub fn extract_snapshot(html: &str, defaults: &StopNames) -> ApproachSnapshot {
    let update_time = UPDATE_TIME
        .probe(html)
        .unwrap_or_else(|| UNKNOWN_UPDATE_TIME.to_string());
    let stop_from = STOP_FROM.probe(html).unwrap_or_else(|| defaults.from.clone());
    let stop_to = STOP_TO.probe(html).unwrap_or_else(|| defaults.to.clone());

    if !has_approach_data(html) {
        return ApproachSnapshot::no_data(update_time, stop_from, stop_to, NO_APPROACH_MARKER);
    }

    let record = first_record_block(html)
        .map(BusRecord::from_block)
        .unwrap_or_default();

    ApproachSnapshot {
        update_time,
        stop_from,
        stop_to,
        has_data: true,
        error_message: None,
        approach: record.approach,
        route: record.route,
        destination: record.destination,
        pass_time: record.pass_time,
        delay: record.delay,
        current_location: record.current_location,
        relative_position: record.relative_position,
    }
}

/// Extractor bound to a route's fallback stop names
#[derive(Debug, Clone, Default)]
pub struct ApproachExtractor {
    defaults: StopNames,
}

impl ApproachExtractor {
    pub fn new(defaults: StopNames) -> Self {
        Self { defaults }
    }

    pub fn extract(&self, html: &str) -> ApproachSnapshot {
        extract_snapshot(html, &self.defaults)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{NO_APPROACH, TWO_BUSES};
    use super::*;

    fn extract(html: &str) -> ApproachSnapshot {
        extract_snapshot(html, &StopNames::default())
    }

    #[test]
    fn test_minimal_record_scenario() {
        let html = r#"<span id="updateTime">12:30</span><p>x</p><div class="approachData"><div class="head"><div id="approachInfo" class="approachCaption">あと3分で到着予定</div><p>y</p><span id="routeNm">1番</span><p>z</p></div></div></div>"#;
        let snapshot = extract(html);

        assert!(snapshot.has_data);
        assert_eq!(snapshot.error_message, None);
        assert_eq!(snapshot.update_time, "12:30");
        assert_eq!(snapshot.approach, "あと3分で到着予定");
        assert_eq!(snapshot.route, "1番");
        assert_eq!(snapshot.destination, "");
    }

    #[test]
    fn test_full_record_takes_first_block_only() {
        let snapshot = extract(TWO_BUSES);

        assert!(snapshot.has_data);
        assert_eq!(snapshot.update_time, "12:30");
        assert_eq!(snapshot.stop_from, "茨城高専前");
        assert_eq!(snapshot.stop_to, "勝田駅前");
        assert_eq!(snapshot.approach, "あと3分で到着予定");
        assert_eq!(snapshot.route, "1番");
        assert_eq!(snapshot.destination, "勝田駅行");
        assert_eq!(snapshot.pass_time, "12:33発");
        assert_eq!(snapshot.delay, "約2分遅れ");
        assert_eq!(snapshot.current_location, "市毛");
        assert_eq!(snapshot.relative_position, "5個前");
    }

    #[test]
    fn test_second_block_never_leaks_into_record() {
        // Drop the first bus's delay; the second bus's delay must not fill the gap
        let html = TWO_BUSES.replacen(
            r#"<span id="passInfo" class="passInfoText">約2分遅れ</span>"#,
            "",
            1,
        );
        let snapshot = extract(&html);

        assert_eq!(snapshot.delay, "");
        assert_eq!(snapshot.route, "1番");

        let block = first_record_block(TWO_BUSES).unwrap();
        assert!(block.contains("1番"));
        assert!(!block.contains("3番"));
    }

    #[test]
    fn test_missing_sub_field_only_blanks_that_field() {
        let html = TWO_BUSES.replacen(r#"<span id="destNm" class="destNm">勝田駅行</span>"#, "", 1);
        let snapshot = extract(&html);

        assert_eq!(snapshot.destination, "");
        assert_eq!(snapshot.approach, "あと3分で到着予定");
        assert_eq!(snapshot.route, "1番");
        assert_eq!(snapshot.pass_time, "12:33発");
        assert_eq!(snapshot.delay, "約2分遅れ");
        assert_eq!(snapshot.current_location, "市毛");
        assert_eq!(snapshot.relative_position, "5個前");
    }

    #[test]
    fn test_no_data_scenario() {
        let snapshot = extract(NO_APPROACH);

        assert!(!snapshot.has_data);
        assert_eq!(
            snapshot.error_message.as_deref(),
            Some("該当する接近情報はありません")
        );
        assert_eq!(snapshot.update_time, "23:10");
        for field in [
            &snapshot.approach,
            &snapshot.route,
            &snapshot.destination,
            &snapshot.pass_time,
            &snapshot.delay,
            &snapshot.current_location,
            &snapshot.relative_position,
        ] {
            assert!(field.is_empty());
        }
    }

    #[test]
    fn test_no_data_marker_wins_over_record_blocks() {
        let html = format!("{}<p>該当する接近情報はありません</p>", TWO_BUSES);
        let snapshot = extract(&html);

        assert!(!snapshot.has_data);
        assert!(snapshot.approach.is_empty());
        assert!(snapshot.route.is_empty());
        assert_eq!(snapshot.stop_from, "茨城高専前");
    }

    #[test]
    fn test_defaults_for_empty_document() {
        let defaults = StopNames {
            from: "From".to_string(),
            to: "To".to_string(),
        };
        let snapshot = extract_snapshot("", &defaults);

        assert!(snapshot.has_data);
        assert_eq!(snapshot.error_message, None);
        assert_eq!(snapshot.update_time, UNKNOWN_UPDATE_TIME);
        assert_eq!(snapshot.stop_from, "From");
        assert_eq!(snapshot.stop_to, "To");
        assert!(snapshot.approach.is_empty());
    }

    #[test]
    fn test_malformed_markup_does_not_panic() {
        let html = r#"<div class="approachData"><span id="routeNm">1番<span id="updateTime"></span></div"#;
        let snapshot = extract(html);

        assert_eq!(snapshot.update_time, UNKNOWN_UPDATE_TIME);
        assert!(snapshot.route.is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extractor = ApproachExtractor::default();
        assert_eq!(extractor.extract(TWO_BUSES), extractor.extract(TWO_BUSES));
        assert_eq!(extractor.extract(NO_APPROACH), extractor.extract(NO_APPROACH));
    }

    #[test]
    fn test_probe_names_and_trimming() {
        assert_eq!(APPROACH.name(), "approach");
        let html = r#"<div id="approachInfo" class="approachCaption">
            まもなく到着します
        </div>"#;
        assert_eq!(APPROACH.probe(html).as_deref(), Some("まもなく到着します"));
        assert_eq!(ROUTE.probe(html), None);
    }
}
