//! Turns session snapshots into terminal lines.

use search_session::{FlightOffer, SearchFilters, SessionId, SessionSnapshot, SessionStatus};

const BAR_WIDTH: usize = 20;

/// Remembers what was already printed so every snapshot only adds what is new.
#[derive(Debug, Default)]
pub struct Renderer {
    listing: Option<(SessionId, SearchFilters)>,
    printed: Vec<String>,
    last_status: String,
}

impl Renderer {
    pub fn render(&mut self, snapshot: &SessionSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        let listing = snapshot.session_id.map(|id| (id, snapshot.filters.clone()));
        let held_prefix = snapshot
            .results
            .iter()
            .zip(&self.printed)
            .all(|(offer, id)| &offer.id == id);
        if listing != self.listing || snapshot.results.len() < self.printed.len() || !held_prefix {
            self.printed.clear();
            if let Some((_, filters)) = &listing {
                lines.push(format!("-- results (filters: {filters}) --"));
            }
            self.listing = listing;
        }

        for offer in &snapshot.results[self.printed.len()..] {
            lines.push(format_offer(offer));
            self.printed.push(offer.id.clone());
        }

        let status = format_status(snapshot);
        if status != self.last_status {
            lines.push(status.clone());
            self.last_status = status;
        }
        lines
    }
}

pub fn format_offer(offer: &FlightOffer) -> String {
    let stops = match offer.stops {
        0 => "nonstop".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{n} stops"),
    };
    format!(
        "  {:<14} {:<3} {}-{}  {:02}:{:02}  {:>2}h{:02}m  {:<8} ${:>4}",
        offer.id,
        offer.airline,
        offer.origin,
        offer.destination,
        offer.departure_minute / 60,
        offer.departure_minute % 60,
        offer.duration_minutes / 60,
        offer.duration_minutes % 60,
        stops,
        offer.price
    )
}

pub fn progress_bar(progress: f64) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn format_status(snapshot: &SessionSnapshot) -> String {
    let mut status = format!(
        "{} {:>3.0}% {:<12} {} shown, {} matching, page {}",
        progress_bar(snapshot.progress),
        snapshot.progress * 100.0,
        snapshot.status.to_string().to_lowercase(),
        snapshot.results.len(),
        snapshot.total,
        snapshot.page
    );
    if snapshot.in_flight {
        status.push_str(", fetching");
    } else if snapshot.poll_armed {
        status.push_str(", next poll scheduled");
    }
    if snapshot.has_more && matches!(snapshot.status, SessionStatus::Polling) {
        status.push_str(" (/more for the next page)");
    }
    if let Some(error) = &snapshot.last_error {
        status.push_str(&format!(" | error: {error}"));
    }
    status
}
