// Request bodies for the booking, inquiry, custom tour and guide registration forms.
// Local checks are necessary but not sufficient; the server has the final say.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::catalog::ResourceKind;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

// Every failed field check of one submission attempt
#[derive(Error, Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[error("{} field(s) failed validation", .0.len())]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn push(&mut self, field: &str, code: &str, message: &str) {
        self.0.push(FieldError {
            field: field.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    fn into_result(mut self) -> Result<(), FieldErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            self.0.sort_by(|a, b| a.field.cmp(&b.field));
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::default();
        for (field, errs) in errors.field_errors() {
            for e in errs {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                out.push(&field.to_string(), &e.code, &message);
            }
        }
        out
    }
}

fn derived_errors<T: Validate>(form: &T) -> FieldErrors {
    match form.validate() {
        Ok(()) => FieldErrors::default(),
        Err(errors) => errors.into(),
    }
}

fn require_text(errors: &mut FieldErrors, field: &str, value: &str, label: &str) {
    if value.trim().is_empty() {
        errors.push(field, "required", &format!("{} is required", label));
    }
}

fn check_date(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(field, "required", "Travel date is required");
    } else if NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).is_err() {
        errors.push(field, "invalid_date", "Travel date must be YYYY-MM-DD");
    }
}

// A form body the request pipeline can submit
pub trait SubmissionForm: Serialize + Clone + Send + Sync + 'static {
    const RESOURCE: ResourceKind;

    fn check(&self) -> Result<(), FieldErrors>;

    // Cached collections that are stale once the server accepts this form
    fn invalidates(&self) -> Vec<ResourceKind> {
        vec![Self::RESOURCE]
    }

    // Title and description of the confirmation toast
    fn success_message(&self) -> (String, String);

    fn failure_title(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingTarget {
    #[default]
    Tour,
    Hotel,
    Festival,
}

impl BookingTarget {
    pub fn resource(&self) -> ResourceKind {
        match self {
            BookingTarget::Tour => ResourceKind::Tours,
            BookingTarget::Hotel => ResourceKind::Hotels,
            BookingTarget::Festival => ResourceKind::Festivals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub first_name: String,
    pub last_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub travel_date: String,
    #[validate(range(min = 1, message = "At least one traveller is required"))]
    pub group_size: u32,
    pub target: BookingTarget,
    pub item_id: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Special requests are too long"))]
    pub special_requests: String,
}

impl BookingRequest {
    pub fn for_item(target: BookingTarget, item_id: impl Into<String>) -> Self {
        Self {
            target,
            item_id: item_id.into(),
            group_size: 1,
            ..Self::default()
        }
    }
}

impl SubmissionForm for BookingRequest {
    const RESOURCE: ResourceKind = ResourceKind::Bookings;

    fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = derived_errors(self);
        require_text(&mut errors, "first_name", &self.first_name, "First name");
        require_text(&mut errors, "last_name", &self.last_name, "Last name");
        check_date(&mut errors, "travel_date", &self.travel_date);
        require_text(&mut errors, "item_id", &self.item_id, "Selected item");
        errors.into_result()
    }

    // Availability of the booked item may have changed too
    fn invalidates(&self) -> Vec<ResourceKind> {
        vec![Self::RESOURCE, self.target.resource()]
    }

    fn success_message(&self) -> (String, String) {
        (
            "Booking request received".to_string(),
            format!(
                "Thank you, {}! Our team will contact you within 24 hours to confirm your booking.",
                self.first_name.trim()
            ),
        )
    }

    fn failure_title(&self) -> &'static str {
        "Booking failed"
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InquiryRequest {
    pub first_name: String,
    pub last_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub travel_date: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, message = "At least one traveller is required"))]
    pub group_size: Option<u32>,
    #[validate(length(max = 2000, message = "Message is too long"))]
    pub message: String,
}

impl SubmissionForm for InquiryRequest {
    const RESOURCE: ResourceKind = ResourceKind::Inquiries;

    fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = derived_errors(self);
        require_text(&mut errors, "first_name", &self.first_name, "First name");
        require_text(&mut errors, "last_name", &self.last_name, "Last name");
        require_text(&mut errors, "message", &self.message, "Message");
        // Optional here, but must be a real date when given
        if let Some(date) = self.travel_date.as_deref().filter(|d| !d.trim().is_empty()) {
            check_date(&mut errors, "travel_date", date);
        }
        errors.into_result()
    }

    fn success_message(&self) -> (String, String) {
        (
            "Inquiry sent".to_string(),
            "Thanks for reaching out! A travel specialist will reply within 24 hours.".to_string(),
        )
    }

    fn failure_title(&self) -> &'static str {
        "Could not send inquiry"
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomTourRequest {
    pub first_name: String,
    pub last_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[validate(length(min = 1, message = "Pick at least one destination"))]
    pub destinations: Vec<String>,
    pub travel_date: String,
    #[validate(range(min = 1, max = 90, message = "Duration must be between 1 and 90 days"))]
    pub duration_days: u32,
    #[validate(range(min = 1, message = "At least one traveller is required"))]
    pub group_size: u32,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Budget cannot be negative"))]
    pub budget: Option<f64>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Notes are too long"))]
    pub notes: String,
}

impl SubmissionForm for CustomTourRequest {
    const RESOURCE: ResourceKind = ResourceKind::CustomTours;

    fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = derived_errors(self);
        require_text(&mut errors, "first_name", &self.first_name, "First name");
        require_text(&mut errors, "last_name", &self.last_name, "Last name");
        check_date(&mut errors, "travel_date", &self.travel_date);
        errors.into_result()
    }

    fn success_message(&self) -> (String, String) {
        (
            "Custom tour request received".to_string(),
            "We will send you a tailored itinerary within 48 hours.".to_string(),
        )
    }

    fn failure_title(&self) -> &'static str {
        "Could not submit custom tour request"
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuideRegistration {
    pub first_name: String,
    pub last_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    pub phone: String,
    #[validate(length(min = 1, message = "List at least one language"))]
    pub languages: Vec<String>,
    #[validate(length(min = 1, message = "List at least one region"))]
    pub regions: Vec<String>,
    #[validate(range(max = 60, message = "Experience must be at most 60 years"))]
    pub experience_years: u32,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Bio is too long"))]
    pub bio: String,
}

impl SubmissionForm for GuideRegistration {
    const RESOURCE: ResourceKind = ResourceKind::Guides;

    fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = derived_errors(self);
        require_text(&mut errors, "first_name", &self.first_name, "First name");
        require_text(&mut errors, "last_name", &self.last_name, "Last name");
        require_text(&mut errors, "phone", &self.phone, "Phone number");
        errors.into_result()
    }

    fn success_message(&self) -> (String, String) {
        (
            "Registration submitted".to_string(),
            "We will review your application and get back to you within 3-5 business days."
                .to_string(),
        )
    }

    fn failure_title(&self) -> &'static str {
        "Registration failed"
    }
}
