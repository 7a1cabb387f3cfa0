//! Extracts purchase hints from the success URL a checkout redirects to.
//!
//! Checkout sessions are created with a return URL of the form
//! `https://<host>/event/<slug>/success?ticketTypeId=<id>&quantity=<n>`. When a notification carries no product
//! mapping and no metadata, this URL is the last place to find out what was bought.
use log::trace;
use url::Url;

use crate::db_types::TicketTypeId;

const PATH_EVENT_MARKERS: [&str; 2] = ["event", "events"];
const TICKET_TYPE_PARAMS: [&str; 2] = ["ticketTypeId", "ticket_type_id"];
const QUANTITY_PARAM: &str = "quantity";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnUrlHints {
    pub event_slug: Option<String>,
    pub ticket_type_id: Option<TicketTypeId>,
    /// Only set when the query string carries a positive integer.
    pub quantity: Option<i64>,
}

impl ReturnUrlHints {
    pub fn is_empty(&self) -> bool {
        self.event_slug.is_none() && self.ticket_type_id.is_none() && self.quantity.is_none()
    }
}

/// Parses the return URL. Relative URLs are accepted. Returns `None` if the string cannot be parsed as a URL at all.
pub fn parse_return_url(return_url: &str) -> Option<ReturnUrlHints> {
    let url = match Url::parse(return_url) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse("http://localhost/").ok()?;
            base.join(return_url).ok()?
        },
        Err(e) => {
            trace!("🔎️ Return URL {return_url} could not be parsed. {e}");
            return None;
        },
    };
    let segments = url.path_segments().map(|s| s.filter(|p| !p.is_empty()).collect::<Vec<_>>()).unwrap_or_default();
    let event_slug = segments
        .windows(2)
        .find(|pair| PATH_EVENT_MARKERS.contains(&pair[0]))
        .map(|pair| pair[1].to_string());
    let mut hints = ReturnUrlHints { event_slug, ..Default::default() };
    for (key, value) in url.query_pairs() {
        if TICKET_TYPE_PARAMS.contains(&key.as_ref()) && !value.trim().is_empty() {
            hints.ticket_type_id = Some(TicketTypeId::from(value.trim()));
        } else if key == QUANTITY_PARAM {
            hints.quantity = value.trim().parse::<i64>().ok().filter(|q| *q > 0);
        }
    }
    Some(hints)
}
