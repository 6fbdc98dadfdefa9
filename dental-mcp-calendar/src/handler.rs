//! Appointment handler for the Calendar MCP server.
//!
//! This module provides the `CalendarHandler` struct and the parameter and
//! result types of the six appointment tools. Dates are `YYYY-MM-DD`, times
//! `HH:MM`, both read in the clinic timezone. Every appointment lasts one slot.

use crate::client::{Attendee, CalendarClient, Event, EventDateTime, ReminderOverride, Reminders};
use crate::slots::{self, Busy, Slot};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime};
use dental_mcp_common::auth::AuthProvider;
use dental_mcp_common::config::CalendarConfig;
use dental_mcp_common::error::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Summary prefix marking a cancelled appointment.
pub const CANCELLED_PREFIX: &str = "[GEANNULEERD] ";

/// Reason recorded when the caller gives none.
pub const DEFAULT_CANCEL_REASON: &str = "Geannuleerd door patiënt";

/// Email reminder one day ahead.
pub const EMAIL_REMINDER_MINUTES: u32 = 24 * 60;

/// Popup reminder half an hour ahead.
pub const POPUP_REMINDER_MINUTES: u32 = 30;

/// Validation error details for tool parameters.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn require(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError {
            field: field.to_string(),
            message: "is required".to_string(),
        });
    }
}

fn into_result(errors: Vec<ValidationError>) -> Result<(), Error> {
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    Err(Error::validation(messages.join("; ")))
}

/// Parameters for `check_available_slots`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CheckSlotsParams {
    /// Date in YYYY-MM-DD format
    pub date: String,
}

impl CheckSlotsParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();
        require(&mut errors, "date", &self.date);
        into_result(errors)
    }
}

/// Parameters for `book_appointment`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct BookAppointmentParams {
    /// Full name of the patient
    pub patient_name: String,
    /// Email address of the patient; added as attendee
    pub patient_email: String,
    /// Date in YYYY-MM-DD format
    pub date: String,
    /// Start time in HH:MM format
    pub time: String,
    /// Kind of appointment, e.g. "controle" or "gebitsreiniging"
    pub appointment_type: String,
}

impl BookAppointmentParams {
    /// Validate the parameters.
    ///
    /// Collects every problem instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();
        require(&mut errors, "patient_name", &self.patient_name);
        require(&mut errors, "patient_email", &self.patient_email);
        require(&mut errors, "date", &self.date);
        require(&mut errors, "time", &self.time);
        require(&mut errors, "appointment_type", &self.appointment_type);

        let email = self.patient_email.trim();
        if !email.is_empty() && !email.contains('@') {
            errors.push(ValidationError {
                field: "patient_email".to_string(),
                message: format!("'{}' is not an email address", email),
            });
        }
        into_result(errors)
    }
}

/// Parameters for `list_appointments`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ListAppointmentsParams {
    /// First day, YYYY-MM-DD
    pub start_date: String,
    /// Last day (inclusive), YYYY-MM-DD
    pub end_date: String,
}

impl ListAppointmentsParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();
        require(&mut errors, "start_date", &self.start_date);
        require(&mut errors, "end_date", &self.end_date);
        into_result(errors)
    }
}

/// Parameters for `get_appointment_details`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct AppointmentIdParams {
    /// Calendar event id
    pub event_id: String,
}

impl AppointmentIdParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();
        require(&mut errors, "event_id", &self.event_id);
        into_result(errors)
    }
}

/// Parameters for `cancel_appointment`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CancelAppointmentParams {
    /// Calendar event id
    pub event_id: String,
    /// Why the appointment is cancelled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CancelAppointmentParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();
        require(&mut errors, "event_id", &self.event_id);
        into_result(errors)
    }

    /// The given reason, or the default one when blank.
    pub fn reason(&self) -> &str {
        match self.reason.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => r,
            _ => DEFAULT_CANCEL_REASON,
        }
    }
}

/// Parameters for `reschedule_appointment`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RescheduleAppointmentParams {
    /// Calendar event id
    pub event_id: String,
    /// New date in YYYY-MM-DD format
    pub new_date: String,
    /// New start time in HH:MM format
    pub new_time: String,
}

impl RescheduleAppointmentParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();
        require(&mut errors, "event_id", &self.event_id);
        require(&mut errors, "new_date", &self.new_date);
        require(&mut errors, "new_time", &self.new_time);
        into_result(errors)
    }
}

/// Result of `check_available_slots`.
#[derive(Debug, Clone, Serialize)]
pub struct SlotsResult {
    pub date: String,
    pub available_slots: Vec<Slot>,
    pub business_hours: String,
}

/// Result of `book_appointment`.
#[derive(Debug, Clone, Serialize)]
pub struct BookingResult {
    pub success: bool,
    pub event_id: String,
    pub message: String,
    pub event: Event,
}

/// One entry of `list_appointments`.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentSummary {
    pub id: String,
    pub summary: String,
    pub start: String,
    pub end: String,
    pub description: String,
    pub attendees: Vec<Attendee>,
}

/// Result of `list_appointments`.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentList {
    pub appointments: Vec<AppointmentSummary>,
    pub count: usize,
}

/// Result of `get_appointment_details`.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    pub id: String,
    pub summary: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub description: String,
    pub attendees: Vec<Attendee>,
    pub status: String,
}

/// Result of `cancel_appointment`.
#[derive(Debug, Clone, Serialize)]
pub struct CancellationResult {
    pub success: bool,
    pub message: String,
    pub reason: String,
}

/// Result of `reschedule_appointment`.
#[derive(Debug, Clone, Serialize)]
pub struct RescheduleResult {
    pub success: bool,
    pub message: String,
    pub new_start: String,
    pub new_end: String,
}

/// Cancelled events stay in the calendar but no longer occupy their time.
fn is_cancelled(event: &Event) -> bool {
    event.status.as_deref() == Some("cancelled")
        || event
            .summary
            .as_deref()
            .is_some_and(|s| s.starts_with(CANCELLED_PREFIX))
}

fn busy_period(event: &Event) -> Option<Busy> {
    if is_cancelled(event) {
        return None;
    }
    if let Some((start, end)) = event.timed_span() {
        return Some(Busy::Timed { start, end });
    }
    event
        .all_day_span()
        .map(|(start, end)| Busy::AllDay { start, end })
}

/// Appointment handler.
///
/// Handles the appointment tools against one Google Calendar.
pub struct CalendarHandler {
    /// Application configuration.
    pub config: CalendarConfig,
    /// Calendar API client.
    pub client: CalendarClient,
}

impl CalendarHandler {
    /// Create a new CalendarHandler with the given configuration.
    ///
    /// # Errors
    /// Returns `Error::Auth` if `GOOGLE_OAUTH_CREDENTIALS` is missing or malformed.
    #[instrument(level = "debug", name = "calendar_handler_new", skip_all)]
    pub fn new(config: CalendarConfig) -> Result<Self, Error> {
        debug!("Initializing CalendarHandler");
        let auth = AuthProvider::from_credentials(config.oauth_credentials.as_deref())?;
        let client = CalendarClient::new(&config, auth);
        Ok(Self { config, client })
    }

    /// Create a handler around an existing client.
    pub fn with_client(config: CalendarConfig, client: CalendarClient) -> Self {
        Self { config, client }
    }

    fn zone_name(&self) -> &'static str {
        self.config.timezone.name()
    }

    fn appointment_window(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), Error> {
        let start = slots::localize(self.config.timezone, date, time)?;
        Ok((start, start + slots::slot_length(&self.config.hours)))
    }

    /// List free slots on a day.
    #[instrument(level = "info", name = "check_available_slots", skip(self))]
    pub async fn check_available_slots(&self, params: CheckSlotsParams) -> Result<SlotsResult, Error> {
        params.validate()?;
        let date = slots::parse_date("date", &params.date)?;
        let hours = &self.config.hours;
        let tz = self.config.timezone;

        let busy = if hours.is_working_day(date.weekday()) {
            let (open, close) = slots::business_window(tz, date, hours)?;
            self.client
                .list_events(open, close)
                .await?
                .iter()
                .filter_map(busy_period)
                .collect()
        } else {
            debug!(date = %date, "Clinic closed, skipping calendar lookup");
            Vec::new()
        };

        let available_slots = slots::available_slots(tz, date, hours, &busy)?;
        info!(date = %date, free = available_slots.len(), "Checked availability");

        Ok(SlotsResult {
            date: params.date.trim().to_string(),
            available_slots,
            business_hours: hours.label(),
        })
    }

    /// Book an appointment starting at the given date and time.
    #[instrument(level = "info", name = "book_appointment", skip(self, params))]
    pub async fn book_appointment(&self, params: BookAppointmentParams) -> Result<BookingResult, Error> {
        params.validate()?;
        let date = slots::parse_date("date", &params.date)?;
        let time = slots::parse_time("time", &params.time)?;
        let (start, end) = self.appointment_window(date, time)?;

        let name = params.patient_name.trim();
        let email = params.patient_email.trim();
        let event = Event {
            summary: Some(format!("Afspraak - {}", name)),
            description: Some(format!(
                "Type: {}\nPatiënt: {}\nEmail: {}",
                params.appointment_type.trim(),
                name,
                email
            )),
            start: Some(EventDateTime::timed(start, self.zone_name())),
            end: Some(EventDateTime::timed(end, self.zone_name())),
            attendees: vec![Attendee {
                email: email.to_string(),
                display_name: Some(name.to_string()),
                extra: Default::default(),
            }],
            reminders: Some(Reminders {
                use_default: false,
                overrides: vec![
                    ReminderOverride {
                        method: "email".to_string(),
                        minutes: EMAIL_REMINDER_MINUTES,
                    },
                    ReminderOverride {
                        method: "popup".to_string(),
                        minutes: POPUP_REMINDER_MINUTES,
                    },
                ],
            }),
            ..Default::default()
        };

        let created = self.client.insert_event(&event).await?;
        let event_id = created.id.clone().unwrap_or_default();
        info!(event_id = %event_id, start = %start, "Appointment booked");

        Ok(BookingResult {
            success: true,
            event_id,
            message: format!(
                "Afspraak geboekt voor {} op {} om {}",
                name,
                params.date.trim(),
                params.time.trim()
            ),
            event: created,
        })
    }

    /// List timed appointments from the start of `start_date` up to the end of `end_date`.
    #[instrument(level = "info", name = "list_appointments", skip(self))]
    pub async fn list_appointments(&self, params: ListAppointmentsParams) -> Result<AppointmentList, Error> {
        params.validate()?;
        let first = slots::parse_date("start_date", &params.start_date)?;
        let last = slots::parse_date("end_date", &params.end_date)?;
        if last < first {
            return Err(Error::validation("end_date must not be before start_date"));
        }

        let tz = self.config.timezone;
        let time_min = slots::localize(tz, first, NaiveTime::MIN)?;
        let after_last = last
            .succ_opt()
            .ok_or_else(|| Error::validation("end_date is out of range"))?;
        let time_max = slots::localize(tz, after_last, NaiveTime::MIN)?;

        let events = self.client.list_events(time_min, time_max).await?;
        let appointments: Vec<AppointmentSummary> = events
            .into_iter()
            .filter_map(|event| {
                let (start, end) = event.timed_span()?;
                Some(AppointmentSummary {
                    id: event.id.unwrap_or_default(),
                    summary: event.summary.unwrap_or_default(),
                    start: start.to_rfc3339(),
                    end: end.to_rfc3339(),
                    description: event.description.unwrap_or_default(),
                    attendees: event.attendees,
                })
            })
            .collect();

        info!(count = appointments.len(), "Listed appointments");
        Ok(AppointmentList {
            count: appointments.len(),
            appointments,
        })
    }

    /// Fetch one appointment.
    #[instrument(level = "info", name = "get_appointment_details", skip(self))]
    pub async fn get_appointment_details(
        &self,
        params: AppointmentIdParams,
    ) -> Result<AppointmentDetails, Error> {
        params.validate()?;
        let event = self.client.get_event(params.event_id.trim()).await?;

        Ok(AppointmentDetails {
            id: event.id.unwrap_or_default(),
            summary: event.summary.unwrap_or_default(),
            start: event.start.unwrap_or_default(),
            end: event.end.unwrap_or_default(),
            description: event.description.unwrap_or_default(),
            attendees: event.attendees,
            status: event.status.unwrap_or_default(),
        })
    }

    /// Mark an appointment as cancelled. The event is kept so the history stays visible.
    #[instrument(level = "info", name = "cancel_appointment", skip(self))]
    pub async fn cancel_appointment(
        &self,
        params: CancelAppointmentParams,
    ) -> Result<CancellationResult, Error> {
        params.validate()?;
        let event_id = params.event_id.trim();
        let reason = params.reason().to_string();

        let mut event = self.client.get_event(event_id).await?;
        let summary = event.summary.take().unwrap_or_default();
        event.summary = Some(if summary.starts_with(CANCELLED_PREFIX) {
            summary
        } else {
            format!("{}{}", CANCELLED_PREFIX, summary)
        });
        event.description = Some(format!(
            "{}\n\nReden annulering: {}",
            event.description.take().unwrap_or_default(),
            reason
        ));

        self.client.update_event(event_id, &event).await?;
        info!(event_id = %event_id, "Appointment cancelled");

        Ok(CancellationResult {
            success: true,
            message: format!("Afspraak {} is geannuleerd", event_id),
            reason,
        })
    }

    /// Move an appointment, keeping its length at one slot.
    #[instrument(level = "info", name = "reschedule_appointment", skip(self))]
    pub async fn reschedule_appointment(
        &self,
        params: RescheduleAppointmentParams,
    ) -> Result<RescheduleResult, Error> {
        params.validate()?;
        let event_id = params.event_id.trim();
        let date = slots::parse_date("new_date", &params.new_date)?;
        let time = slots::parse_time("new_time", &params.new_time)?;
        let (start, end) = self.appointment_window(date, time)?;

        let mut event = self.client.get_event(event_id).await?;
        event.start = Some(EventDateTime::timed(start, self.zone_name()));
        event.end = Some(EventDateTime::timed(end, self.zone_name()));

        self.client.update_event(event_id, &event).await?;
        info!(event_id = %event_id, start = %start, "Appointment rescheduled");

        Ok(RescheduleResult {
            success: true,
            message: format!(
                "Afspraak {} is verzet naar {} om {}",
                event_id,
                params.new_date.trim(),
                params.new_time.trim()
            ),
            new_start: start.to_rfc3339(),
            new_end: end.to_rfc3339(),
        })
    }
}
