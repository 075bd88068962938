//! Structured extraction from rendered tracking pages.
//!
//! A pure mapping from an HTML snapshot to the data model. Every sub-field
//! is looked up independently and substituted with the `"N/A"` sentinel when
//! absent; a malformed node never aborts extraction of its siblings.
//!
//! The parcel attribute lookups are positional (`nth-child`) on purpose:
//! they mirror the upstream page's table order, row five included in the
//! skip. Do not "generalize" them without the real page to test against.

use scraper::{ElementRef, Html, Selector};

use crate::models::{ParcelInfo, TrackingEvent, TrackingReport, MISSING_FIELD};

/// Convert a rendered snapshot into the full tracking report.
pub fn extract_report(html: &str) -> TrackingReport {
    let document = Html::parse_document(html);
    TrackingReport {
        tracking_details: extract_events(&document),
        parcel_info: extract_parcel_info(&document),
    }
}

fn extract_events(document: &Html) -> Vec<TrackingEvent> {
    let Some(event_selector) = parse_selector(".event") else {
        return Vec::new();
    };

    document
        .select(&event_selector)
        .map(|event| TrackingEvent {
            date: scoped_field(event, ".event-time strong"),
            time: scoped_field(event, ".event-time span"),
            status: scoped_field(event, ".event-content strong"),
            courier: scoped_field(event, ".carrier"),
        })
        .collect()
}

fn extract_parcel_info(document: &Html) -> ParcelInfo {
    ParcelInfo {
        tracking_number: document_field(document, ".parcel-attributes tr:nth-child(1) .value span"),
        origin: document_field(
            document,
            ".parcel-attributes tr:nth-child(2) .value span:nth-child(2)",
        ),
        destination: document_field(
            document,
            ".parcel-attributes tr:nth-child(3) .value span:nth-child(2)",
        ),
        courier: document_field(document, ".parcel-attributes tr:nth-child(4) .value a"),
        days_in_transit: document_field(document, ".parcel-attributes tr:nth-child(6) .value span"),
        tracking_link: tracking_link(document),
    }
}

/// The tracking link lives in an `<input>`; a serialized snapshot carries it
/// in the `value` attribute rather than as text.
fn tracking_link(document: &Html) -> String {
    let node = parse_selector(".tracking-link input")
        .and_then(|selector| document.select(&selector).next());

    let Some(node) = node else {
        return MISSING_FIELD.to_string();
    };

    let text = collect_text(node);
    if text != MISSING_FIELD {
        return text;
    }

    node.value()
        .attr("value")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .unwrap_or_else(|| MISSING_FIELD.to_string())
}

fn document_field(document: &Html, css: &str) -> String {
    let node = parse_selector(css).and_then(|selector| document.select(&selector).next());
    node.map(collect_text)
        .unwrap_or_else(|| MISSING_FIELD.to_string())
}

fn scoped_field(scope: ElementRef<'_>, css: &str) -> String {
    let node = parse_selector(css).and_then(|selector| scope.select(&selector).next());
    node.map(collect_text)
        .unwrap_or_else(|| MISSING_FIELD.to_string())
}

fn collect_text(node: ElementRef<'_>) -> String {
    let text = node.text().collect::<String>();
    let text = text.trim();
    if text.is_empty() {
        MISSING_FIELD.to_string()
    } else {
        text.to_string()
    }
}

fn parse_selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAGE: &str = r#"<html><body>
        <div class="events">
            <div class="event">
                <div class="event-time"><strong>Apr 2, 2024</strong><span>14:05</span></div>
                <div class="event-content"><strong>Delivered</strong></div>
                <div class="carrier">DHL</div>
            </div>
            <div class="event">
                <div class="event-time"><strong>Apr 1, 2024</strong><span>09:30</span></div>
                <div class="event-content"><strong>Out for delivery</strong></div>
                <div class="carrier">DHL</div>
            </div>
            <div class="event">
                <div class="event-time"><strong>Mar 30, 2024</strong><span>18:22</span></div>
                <div class="event-content"><strong>Arrived at sorting center</strong></div>
                <div class="carrier">DHL</div>
            </div>
        </div>
        <table class="parcel-attributes">
            <tr><td class="name">Tracking number</td><td class="value"><span>ABC123</span></td></tr>
            <tr><td class="name">Origin</td><td class="value"><span class="flag"></span><span>Germany</span></td></tr>
            <tr><td class="name">Destination</td><td class="value"><span class="flag"></span><span>United States</span></td></tr>
            <tr><td class="name">Courier</td><td class="value"><a href="/couriers/dhl">DHL Express</a></td></tr>
            <tr><td class="name">Status</td><td class="value"><span>Delivered</span></td></tr>
            <tr><td class="name">Days in transit</td><td class="value"><span>4</span></td></tr>
        </table>
        <div class="tracking-link"><input value="https://parcelsapp.com/en/tracking/ABC123"></div>
    </body></html>"#;

    #[test]
    fn full_page_yields_three_events_and_all_parcel_fields() {
        let report = extract_report(FULL_PAGE);

        assert_eq!(report.tracking_details.len(), 3);
        assert_eq!(
            report.tracking_details[0],
            TrackingEvent {
                date: "Apr 2, 2024".into(),
                time: "14:05".into(),
                status: "Delivered".into(),
                courier: "DHL".into(),
            }
        );

        let parcel = &report.parcel_info;
        assert_eq!(parcel.tracking_number, "ABC123");
        assert_eq!(parcel.origin, "Germany");
        assert_eq!(parcel.destination, "United States");
        assert_eq!(parcel.courier, "DHL Express");
        assert_eq!(parcel.days_in_transit, "4");
        assert_eq!(
            parcel.tracking_link,
            "https://parcelsapp.com/en/tracking/ABC123"
        );
        assert!(![
            &parcel.tracking_number,
            &parcel.origin,
            &parcel.destination,
            &parcel.courier,
            &parcel.days_in_transit,
            &parcel.tracking_link,
        ]
        .iter()
        .any(|field| field.as_str() == MISSING_FIELD));
    }

    #[test]
    fn missing_sub_fields_become_sentinels() {
        let html = r#"<div class="event">
            <div class="event-time"><strong>Apr 2, 2024</strong></div>
        </div>"#;
        let report = extract_report(html);

        assert_eq!(report.tracking_details.len(), 1);
        let event = &report.tracking_details[0];
        assert_eq!(event.date, "Apr 2, 2024");
        assert_eq!(event.time, MISSING_FIELD);
        assert_eq!(event.status, MISSING_FIELD);
        assert_eq!(event.courier, MISSING_FIELD);
    }

    #[test]
    fn one_bare_node_does_not_poison_the_rest() {
        let html = r#"
            <div class="event"></div>
            <div class="event">
                <div class="event-time"><strong>Apr 1, 2024</strong><span>09:30</span></div>
                <div class="event-content"><strong>In transit</strong></div>
                <div class="carrier">UPS</div>
            </div>"#;
        let report = extract_report(html);

        assert_eq!(report.tracking_details.len(), 2);
        assert_eq!(report.tracking_details[0].status, MISSING_FIELD);
        assert_eq!(report.tracking_details[1].status, "In transit");
    }

    #[test]
    fn empty_page_yields_no_events_and_sentinel_parcel() {
        let report = extract_report("<html><body></body></html>");
        assert!(report.tracking_details.is_empty());
        assert_eq!(report.parcel_info, ParcelInfo::default());
    }

    #[test]
    fn parcel_rows_are_positional_not_labelled() {
        // Row order defines meaning; a reordered table maps fields wrong
        // rather than erroring. That is the upstream contract.
        let html = r#"<table class="parcel-attributes">
            <tr><td class="value"><span>FIRST</span></td></tr>
        </table>"#;
        let report = extract_report(html);
        assert_eq!(report.parcel_info.tracking_number, "FIRST");
        assert_eq!(report.parcel_info.origin, MISSING_FIELD);
    }

    #[test]
    fn whitespace_only_text_is_missing() {
        let html = r#"<div class="event">
            <div class="event-content"><strong>   </strong></div>
        </div>"#;
        let report = extract_report(html);
        assert_eq!(report.tracking_details[0].status, MISSING_FIELD);
    }
}
