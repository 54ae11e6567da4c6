use chrono::{TimeZone, Utc};
use counselbook_core::errors::AssemblyFailureReason;
use counselbook_core::models::booking::RegistrantFields;
use counselbook_core::models::selection::{Phase, SelectionState};
use counselbook_core::models::slot::TimeFormat;
use counselbook_session::assembler::BookingPayloadAssembler;
use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use pretty_assertions::assert_eq;
use rstest::rstest;
use uuid::Uuid;

use crate::test_utils::*;

fn selection(timezone: chrono_tz::Tz, day: u32, time: Option<&str>) -> SelectionState {
    SelectionState {
        timezone,
        time_format: TimeFormat::TwentyFourHour,
        selected_local_date: Some(date(6, day)),
        selected_display_time: time.map(str::to_string),
        phase: Phase::Registering,
    }
}

#[test]
fn test_request_carries_reference_time_not_local_time() {
    let assembler = BookingPayloadAssembler::new(Some("Career Counselling".to_string()));
    let key = Uuid::new_v4();
    // Selected as June 2nd 01:30 in Kolkata, published as June 1st 20:00 UTC.
    let state = selection(chrono_tz::Asia::Kolkata, 2, Some("01:30-02:30"));

    let request = assembler
        .assemble(&state, &sample_slots(), &registrant(), key)
        .unwrap();

    assert_eq!(request.idempotency_key, key);
    assert_eq!(request.reference_date, date(6, 1));
    assert_eq!(request.reference_time_range.to_string(), "20:00-21:00");
    assert_eq!(request.reference_timezone, "UTC");
    assert_eq!(
        request.starts_at,
        Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap()
    );
    assert_eq!(request.counselor_id, "c-2");
    assert_eq!(request.counselor_email, "c-2@example.com");
    assert_eq!(request.timezone, "Asia/Kolkata");
    assert_eq!(request.program.as_deref(), Some("Career Counselling"));
    assert_eq!(request.registrant, registrant());
}

#[test]
fn test_registrant_fields_are_forwarded_verbatim() {
    let mut fields = registrant();
    fields.name = Name().fake();
    fields.email = SafeEmail().fake();
    let state = selection(chrono_tz::Asia::Kolkata, 3, Some("14:30-15:30"));

    let request = BookingPayloadAssembler::default()
        .assemble(&state, &sample_slots(), &fields, Uuid::new_v4())
        .unwrap();

    assert_eq!(request.registrant, fields);
    assert_eq!(request.program, None);
}

#[rstest]
#[case(None)]
#[case(Some("22:00-23:00"))]
fn test_incomplete_selection(#[case] time: Option<&str>) {
    let mut state = selection(chrono_tz::Asia::Kolkata, 1, time);
    if time.is_some() {
        state.selected_local_date = None;
    }

    let failure = BookingPayloadAssembler::default()
        .assemble(&state, &sample_slots(), &registrant(), Uuid::new_v4())
        .unwrap_err();

    assert_eq!(failure.reason, AssemblyFailureReason::IncompleteSelection);
}

#[test]
fn test_withdrawn_slot_is_stale() {
    let state = selection(chrono_tz::Asia::Kolkata, 1, Some("22:00-23:00"));
    let remaining: Vec<_> = sample_slots()
        .into_iter()
        .filter(|slot| slot.counselor_id != "c-17")
        .collect();

    let failure = BookingPayloadAssembler::default()
        .assemble(&state, &remaining, &registrant(), Uuid::new_v4())
        .unwrap_err();

    assert_eq!(failure.reason, AssemblyFailureReason::StaleSelection);
}

#[test]
fn test_selection_from_another_timezone_is_stale() {
    // 22:00 is offered on June 1st in Kolkata but not in Tokyo.
    let state = selection(chrono_tz::Asia::Tokyo, 1, Some("22:00-23:00"));

    let failure = BookingPayloadAssembler::default()
        .assemble(&state, &sample_slots(), &registrant(), Uuid::new_v4())
        .unwrap_err();

    assert_eq!(failure.reason, AssemblyFailureReason::StaleSelection);
}

#[rstest]
#[case(RegistrantFields { name: String::new(), ..registrant() }, "name is required")]
#[case(RegistrantFields { email: "not-an-email".to_string(), ..registrant() }, "'not-an-email' is not a valid email address")]
#[case(RegistrantFields { parent_confirmed: false, ..registrant() }, "parent availability must be confirmed")]
fn test_invalid_registrant(#[case] fields: RegistrantFields, #[case] message: &str) {
    let state = selection(chrono_tz::Asia::Kolkata, 1, Some("22:00-23:00"));

    let failure = BookingPayloadAssembler::default()
        .assemble(&state, &sample_slots(), &fields, Uuid::new_v4())
        .unwrap_err();

    assert_eq!(
        failure.reason,
        AssemblyFailureReason::InvalidRegistrant(message.to_string())
    );
}
