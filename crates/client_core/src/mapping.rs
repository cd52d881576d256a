//! Translation between the backend's wire shape and the display shape.

use chrono::{DateTime, NaiveDateTime, Utc};
use shared::{
    domain::{Rating, SeriesId, WatchStatus},
    protocol::{SeriesDto, SeriesPayload},
};
use tracing::warn;

use crate::types::{Series, SeriesDraft};

/// `WATCHING`/`WATCHED`/`PLAN_TO_WATCH` to a status; anything else is
/// treated as watching.
pub fn status_from_wire(raw: &str) -> WatchStatus {
    WatchStatus::from_wire_name(raw.trim()).unwrap_or(WatchStatus::Watching)
}

/// `Watching`/`Watched`/`Plan to Watch` to a status; anything else is
/// treated as watching and therefore sent as `WATCHING`.
pub fn status_from_label(raw: &str) -> WatchStatus {
    WatchStatus::from_label(raw.trim()).unwrap_or(WatchStatus::Watching)
}

pub fn status_to_wire(status: WatchStatus) -> &'static str {
    status.wire_name()
}

pub fn series_from_wire(dto: SeriesDto, now: DateTime<Utc>) -> Series {
    let id = match dto.id.map(|id| id.into_string()) {
        Some(id) if !id.trim().is_empty() => SeriesId::new(id),
        _ => {
            let placeholder = SeriesId::placeholder();
            warn!(placeholder = %placeholder, "series without id from server");
            placeholder
        }
    };

    let rating = dto.rating.and_then(|raw| match raw {
        0 => None,
        raw => Rating::new(raw)
            .map_err(|err| warn!(series_id = %id, "dropping rating: {err}"))
            .ok(),
    });

    Series {
        status: dto
            .status
            .as_deref()
            .map(status_from_wire)
            .unwrap_or(WatchStatus::Watching),
        title: dto.title.unwrap_or_default(),
        genre: dto.genre.unwrap_or_default(),
        link: dto.link.unwrap_or_default(),
        image_link: dto.image_link.unwrap_or_default(),
        rating,
        date_added: parse_created_at(dto.created_at.as_deref(), now),
        id,
    }
}

pub fn series_to_wire(series: &Series) -> SeriesPayload {
    payload(
        &series.title,
        &series.genre,
        series.status,
        &series.link,
        &series.image_link,
        series.rating,
    )
}

pub fn draft_to_wire(draft: &SeriesDraft) -> SeriesPayload {
    payload(
        &draft.title,
        &draft.genre,
        draft.status,
        &draft.link,
        &draft.image_link,
        draft.rating,
    )
}

fn payload(
    title: &str,
    genre: &str,
    status: WatchStatus,
    link: &str,
    image_link: &str,
    rating: Option<Rating>,
) -> SeriesPayload {
    SeriesPayload {
        title: title.to_string(),
        genre: genre.to_string(),
        status: status_to_wire(status).to_string(),
        image_link: image_link.to_string(),
        link: link.to_string(),
        rating: rating.map(i64::from),
    }
}

/// Accepts RFC 3339 timestamps and zone-less ISO timestamps (read as UTC).
/// Missing or unreadable values fall back to `now`.
pub fn parse_created_at(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return now;
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc();
    }
    warn!(created_at = raw, "unreadable createdAt from server");
    now
}

#[cfg(test)]
#[path = "tests/mapping_tests.rs"]
mod tests;
