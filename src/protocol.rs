use std::time::Duration;

pub const PING_ENDPOINT: &str = "/ping";
pub const DIRECT_OBJECTS_ENDPOINT: &str = "/core/direct_objects";
pub const DOMAIN_OBJECTS_ENDPOINT: &str = "/core/domain_objects";
pub const LOCATIONS_ENDPOINT: &str = "/core/locations";
pub const APPLIANCES_ENDPOINT: &str = "/core/appliances";
pub const RULES_ENDPOINT: &str = "/core/rules";

pub const DEFAULT_USERNAME: &str = "smile";
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const MIN_TIME_BETWEEN_UPDATES: Duration = Duration::from_secs(2);

pub const DEFAULT_CONNECT_RETRIES: u32 = 2;
pub const DEFAULT_REQUEST_RETRIES: u32 = 3;

/// An idle Smile answers `/ping` with an error document; anything else means
/// something other than a Smile is listening.
const PING_MARKER: &str = "error";

const NO_DATA_PAYLOAD: &str = r#"{"errorCode":0}"#;

pub fn is_ping_response(body: &str) -> bool {
    body.contains(PING_MARKER)
}

/// Bodies the Smile sends instead of XML when it has nothing to report.
pub fn is_no_data_payload(body: &str) -> bool {
    body.is_empty() || body == NO_DATA_PAYLOAD
}

/// Escape every `&` that cannot start an entity or character reference.
///
/// The firmware writes raw ampersands into names and descriptions. An `&`
/// followed by a letter or `#` is left alone, so already escaped text is
/// returned unchanged.
pub fn escape_illegal_xml_characters(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut chars = xml.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '&' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(next) if next.is_ascii_alphabetic() || *next == '#' => out.push('&'),
            _ => out.push_str("&amp;"),
        }
    }
    out
}
