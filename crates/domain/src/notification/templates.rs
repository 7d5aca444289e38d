//! HTML email bodies.

use std::collections::HashMap;

use common::Money;
use serde_json::Value;

use super::NotificationError;
use crate::events::{CancellationEvent, RegistrationEvent, ReservationEvent};

pub const RESERVATION_SUBJECT: &str =
    "Stall Reservation Confirmation - Colombo International Bookfair";
pub const REGISTRATION_SUBJECT: &str = "Welcome to Colombo International Bookfair";
pub const CANCELLATION_SUBJECT: &str = "Reservation Cancelled - Colombo International Bookfair";

const GENERAL: &str = r#"<html><body style="font-family: Arial, sans-serif;">
<h2>{{title}}</h2>
<p>Dear {{recipient_name}},</p>
<p>{{message}}</p>
<p>Colombo International Bookfair</p>
</body></html>"#;

const RESERVATION_REMINDER: &str = r#"<html><body style="font-family: Arial, sans-serif;">
<h2>Your stall reservation is coming up</h2>
<p>Dear {{recipient_name}},</p>
<p>Reservation <strong>#{{reservation_id}}</strong> starts on <strong>{{start_date}}</strong>.</p>
<p>Please bring the QR code from your confirmation email to the entrance.</p>
</body></html>"#;

/// Templates selectable by name on a direct send.
const NAMED: &[(&str, &str)] = &[
    ("general", GENERAL),
    ("reservation-reminder", RESERVATION_REMINDER),
];

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replaces every `{{key}}` with the escaped value. Unknown keys become empty.
pub fn substitute(template: &str, data: &HashMap<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = after[..end].trim();
        match data.get(key) {
            Some(Value::String(s)) => out.push_str(&escape(s)),
            Some(Value::Null) | None => {}
            Some(other) => out.push_str(&escape(&other.to_string())),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

pub fn render_named(name: &str, data: &HashMap<String, Value>) -> Result<String, NotificationError> {
    NAMED
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, template)| substitute(template, data))
        .ok_or_else(|| NotificationError::UnknownTemplate(name.to_string()))
}

/// Wraps a plain message in the house layout.
pub fn plain(recipient_name: &str, subject: &str, message: &str) -> String {
    let data = HashMap::from([
        ("title".to_string(), Value::from(subject)),
        ("recipient_name".to_string(), Value::from(recipient_name)),
        ("message".to_string(), Value::from(message)),
    ]);
    substitute(GENERAL, &data)
}

pub fn reservation_confirmation(event: &ReservationEvent, qr_base64: &str) -> String {
    let rows: String = event
        .stalls
        .iter()
        .map(|stall| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&stall.stall_name),
                escape(&stall.stall_size),
                escape(stall.location.as_deref().unwrap_or("-")),
                Money::from_cents(stall.price_cents),
            )
        })
        .collect();

    format!(
        r#"<html><body style="font-family: Arial, sans-serif;">
<h2>Stall Reservation Confirmed</h2>
<p>Dear {name},</p>
<p>Your reservation <strong>#{id}</strong>{business} is confirmed for {start} to {end}.</p>
<table border="1" cellpadding="6" cellspacing="0">
<tr><th>Stall</th><th>Size</th><th>Location</th><th>Price per day</th></tr>
{rows}
</table>
<p><strong>Total: {total}</strong></p>
<p>Show this QR code at the entrance:</p>
<img src="data:image/png;base64,{qr}" alt="Reservation QR code" width="300" height="300"/>
<p>Colombo International Bookfair</p>
</body></html>"#,
        name = escape(&event.user_name),
        id = escape(&event.reservation_id),
        business = event
            .business_name
            .as_deref()
            .map(|b| format!(" for {}", escape(b)))
            .unwrap_or_default(),
        start = event.start_date,
        end = event.end_date,
        total = Money::from_cents(event.total_amount_cents),
        qr = qr_base64,
    )
}

pub fn registration_confirmation(event: &RegistrationEvent) -> String {
    let password = event
        .temporary_password
        .as_deref()
        .map(|p| {
            format!(
                "<p>Your temporary password is <strong>{}</strong>. Please change it after signing in.</p>",
                escape(p)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<html><body style="font-family: Arial, sans-serif;">
<h2>Welcome to Colombo International Bookfair</h2>
<p>Dear {name},</p>
<p>Your account <strong>{email}</strong>{business} has been created. You can now sign in and reserve stalls.</p>
{password}
<p>Colombo International Bookfair</p>
</body></html>"#,
        name = escape(&event.user_name),
        email = escape(&event.email),
        business = event
            .business_name
            .as_deref()
            .map(|b| format!(" for {}", escape(b)))
            .unwrap_or_default(),
    )
}

pub fn reservation_cancellation(event: &CancellationEvent) -> String {
    let reason = event
        .reason
        .as_deref()
        .map(|r| format!("<p>Reason: {}</p>", escape(r)))
        .unwrap_or_default();

    format!(
        r#"<html><body style="font-family: Arial, sans-serif;">
<h2>Reservation Cancelled</h2>
<p>Dear {name},</p>
<p>Your reservation <strong>#{id}</strong> was cancelled on {at}. Any payment will be refunded.</p>
{reason}
<p>Colombo International Bookfair</p>
</body></html>"#,
        name = escape(&event.user_name),
        id = escape(&event.reservation_id),
        at = event.cancelled_at.format("%Y-%m-%d %H:%M UTC"),
    )
}
