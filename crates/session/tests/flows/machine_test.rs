use chrono::{TimeZone, Utc};
use counselbook_core::errors::BookingError;
use counselbook_core::models::booking::{BookingConfirmation, RegistrantFields};
use counselbook_core::models::selection::Phase;
use counselbook_core::models::slot::TimeFormat;
use counselbook_scheduling::FixedTimezoneResolver;
use counselbook_scheduling::zones::ZONE_OPTIONS;
use counselbook_session::machine::SelectionStateMachine;
use eyre::eyre;
use pretty_assertions::assert_eq;
use test_log::test;

use crate::test_utils::*;

#[test]
fn test_dates_follow_the_caller_calendar() {
    let machine = loaded_machine("Asia/Kolkata");

    assert_eq!(
        machine.index().date_keys(),
        vec!["2025-06-01", "2025-06-02", "2025-06-03"]
    );
    // 20:00 UTC on June 1st is already June 2nd in Kolkata.
    assert_eq!(machine.index().display_times(date(6, 2)), vec!["01:30-02:30"]);
    assert_eq!(
        machine.index().display_times(date(6, 1)),
        vec!["13:30-14:30", "22:00-23:00"]
    );
}

#[test]
fn test_new_session_starts_browsing_with_nothing_selected() {
    let machine = loaded_machine("Asia/Kolkata");

    assert_eq!(machine.phase(), Phase::Browsing);
    assert_eq!(machine.state().selected_local_date, None);
    assert_eq!(machine.state().selected_display_time, None);
    assert!(!machine.is_loading());
    assert!(!machine.is_empty());
}

#[test]
fn test_unknown_caller_timezone_falls_back_to_default() {
    let machine = SelectionStateMachine::new(resolver(), &config("Not/AZone"));

    assert_eq!(machine.state().timezone, chrono_tz::Asia::Dubai);
}

#[test]
fn test_suggests_earliest_future_slot() {
    let machine = loaded_machine("Asia/Kolkata");

    let suggestion = machine.suggestion().unwrap();

    // 13:30 local has already started at 17:30 local.
    assert_eq!(suggestion.local_date, date(6, 1));
    assert_eq!(suggestion.slot.display_time, "22:00-23:00");
    assert_eq!(machine.state().selected_local_date, None);
}

#[test]
fn test_accept_suggestion_selects_date_only() {
    let mut machine = loaded_machine("America/Los_Angeles");

    let accepted = machine.accept_suggestion().unwrap();

    assert_eq!(accepted, Some(date(6, 1)));
    assert_eq!(machine.state().selected_local_date, Some(date(6, 1)));
    assert_eq!(machine.state().selected_display_time, None);
    assert_eq!(
        machine.available_times(),
        vec!["01:00-02:00", "09:30-10:30", "13:00-14:00"]
    );
}

#[test]
fn test_no_suggestion_when_every_slot_has_started() {
    let later = Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap();
    let mut machine = loaded_machine_at("Asia/Kolkata", later);

    assert!(machine.suggestion().is_none());
    assert_eq!(machine.accept_suggestion().unwrap(), None);
}

#[test]
fn test_empty_listing_shows_empty_state() {
    let mut machine = SelectionStateMachine::new(resolver(), &config("Asia/Kolkata"));
    machine.begin_fetch().unwrap();
    machine.complete_fetch(Vec::new()).unwrap();

    assert!(machine.is_empty());
    assert!(machine.suggestion().is_none());
    assert!(matches!(
        machine.select_date(date(6, 1)),
        Err(BookingError::UnknownDate(_))
    ));
}

#[test]
fn test_timezone_switch_clears_selection_and_rebuilds() {
    let mut machine = loaded_machine("Asia/Kolkata");
    machine.select_date(date(6, 2)).unwrap();

    machine.set_timezone("America/Los_Angeles").unwrap();

    assert_eq!(machine.state().timezone, chrono_tz::America::Los_Angeles);
    assert_eq!(machine.state().selected_local_date, None);
    assert_eq!(machine.state().selected_display_time, None);
    assert_eq!(machine.index().date_keys(), vec!["2025-06-01", "2025-06-03"]);
    assert_eq!(machine.suggestion().unwrap().slot.display_time, "09:30-10:30");
}

#[test]
fn test_invalid_timezone_changes_nothing() {
    let mut machine = loaded_machine("Asia/Kolkata");
    machine.select_date(date(6, 2)).unwrap();
    let before = machine.state().clone();

    let result = machine.set_timezone("Mars/Olympus_Mons");

    assert!(matches!(result, Err(BookingError::InvalidTimezone(id)) if id == "Mars/Olympus_Mons"));
    assert_eq!(machine.state(), &before);
}

#[test]
fn test_timezone_change_rejected_while_registering() {
    let mut machine = loaded_machine("Asia/Kolkata");
    machine.select_date(date(6, 1)).unwrap();
    machine.select_time("22:00-23:00").unwrap();

    let result = machine.set_timezone("Asia/Tokyo");

    assert!(matches!(
        result,
        Err(BookingError::InvalidTransition {
            phase: Phase::Registering,
            ..
        })
    ));
    assert_eq!(machine.state().timezone, chrono_tz::Asia::Kolkata);
}

#[test]
fn test_select_date_rejects_unknown_and_past_dates() {
    let next_day = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
    let mut machine = loaded_machine_at("Asia/Kolkata", next_day);

    assert!(matches!(
        machine.select_date(date(6, 5)),
        Err(BookingError::UnknownDate(d)) if d == "2025-06-05"
    ));
    assert!(matches!(
        machine.select_date(date(6, 1)),
        Err(BookingError::DateInPast(_))
    ));
    machine.select_date(date(6, 2)).unwrap();
    assert_eq!(machine.state().selected_local_date, Some(date(6, 2)));
}

#[test]
fn test_select_date_clears_previous_time() {
    let mut machine = loaded_machine("Asia/Kolkata");
    machine.select_date(date(6, 1)).unwrap();
    machine.select_time("22:00-23:00").unwrap();
    machine.go_back().unwrap();

    machine.select_date(date(6, 3)).unwrap();

    assert_eq!(machine.state().selected_local_date, Some(date(6, 3)));
    assert_eq!(machine.state().selected_display_time, None);
}

#[test]
fn test_select_time_requires_a_date_and_an_offered_time() {
    let mut machine = loaded_machine("Asia/Kolkata");

    assert!(matches!(
        machine.select_time("22:00-23:00"),
        Err(BookingError::NoDateSelected)
    ));

    machine.select_date(date(6, 1)).unwrap();
    assert!(matches!(
        machine.select_time("01:30-02:30"),
        Err(BookingError::UnknownTime { .. })
    ));
    assert_eq!(machine.phase(), Phase::Browsing);

    machine.select_time("22:00-23:00").unwrap();
    assert_eq!(machine.phase(), Phase::Registering);
    assert_eq!(
        machine.selected_slot().unwrap().canonical.counselor_id,
        "c-17"
    );
}

#[test]
fn test_go_back_keeps_the_selection() {
    let mut machine = loaded_machine("Asia/Kolkata");
    machine.select_date(date(6, 1)).unwrap();
    machine.select_time("22:00-23:00").unwrap();

    machine.go_back().unwrap();

    assert_eq!(machine.phase(), Phase::Browsing);
    assert_eq!(
        machine.state().selected_pair(),
        Some((date(6, 1), "22:00-23:00"))
    );
    assert!(matches!(
        machine.go_back(),
        Err(BookingError::InvalidTransition {
            phase: Phase::Browsing,
            ..
        })
    ));
}

#[test]
fn test_time_format_toggle_keeps_selected_slot() {
    let mut machine = loaded_machine("Asia/Kolkata");
    machine.select_date(date(6, 1)).unwrap();
    machine.select_time("22:00-23:00").unwrap();
    machine.go_back().unwrap();

    machine.set_time_format(TimeFormat::TwelveHour).unwrap();

    assert_eq!(
        machine.state().selected_display_time.as_deref(),
        Some("10:00 PM-11:00 PM")
    );
    assert_eq!(
        machine.selected_slot().unwrap().canonical.counselor_id,
        "c-17"
    );
}

#[test]
fn test_timezone_change_during_fetch_applies_on_arrival() {
    let mut machine = SelectionStateMachine::new(resolver(), &config("Asia/Kolkata"));
    machine.begin_fetch().unwrap();

    machine.set_timezone("Asia/Tokyo").unwrap();
    assert!(machine.is_loading());
    assert!(machine.is_empty());

    machine.complete_fetch(sample_slots()).unwrap();

    assert_eq!(machine.index().timezone(), chrono_tz::Asia::Tokyo);
    assert_eq!(machine.index().display_times(date(6, 2)), vec!["01:30-02:30", "05:00-06:00"]);
    assert_eq!(machine.state().selected_local_date, None);
}

#[test]
fn test_fetch_must_be_started_before_completion() {
    let mut machine = SelectionStateMachine::new(resolver(), &config("Asia/Kolkata"));

    assert!(matches!(
        machine.complete_fetch(sample_slots()),
        Err(BookingError::InvalidTransition { .. })
    ));
    assert!(machine.is_empty());
}

#[test]
fn test_aborted_fetch_leaves_empty_state() {
    let mut machine = loaded_machine("Asia/Kolkata");
    machine.begin_fetch().unwrap();

    machine.abort_fetch();

    assert!(!machine.is_loading());
    assert!(machine.is_empty());
}

fn registering(machine: &mut SelectionStateMachine<FixedTimezoneResolver>) {
    machine.select_date(date(6, 1)).unwrap();
    machine.select_time("22:00-23:00").unwrap();
}

#[test]
fn test_stale_selection_returns_to_browsing() {
    let mut machine = loaded_machine("Asia/Kolkata");
    registering(&mut machine);
    let without_selected: Vec<_> = sample_slots()
        .into_iter()
        .filter(|slot| slot.counselor_id != "c-17")
        .collect();

    let result = machine.begin_submission(&registrant(), &without_selected);

    assert!(matches!(result, Err(BookingError::StaleSelection)));
    assert_eq!(machine.phase(), Phase::Browsing);
    assert_eq!(machine.state().selected_pair(), None);
    assert!(!machine.is_submitting());
}

#[test]
fn test_invalid_registrant_stays_registering() {
    let mut machine = loaded_machine("Asia/Kolkata");
    registering(&mut machine);

    let result = machine.begin_submission(&RegistrantFields::default(), &sample_slots());

    assert!(matches!(result, Err(BookingError::Assembly(_))));
    assert_eq!(machine.phase(), Phase::Registering);
    assert!(!machine.is_submitting());
}

#[test]
fn test_submission_is_not_reentrant() {
    let mut machine = loaded_machine("Asia/Kolkata");
    registering(&mut machine);

    machine.begin_submission(&registrant(), &sample_slots()).unwrap();

    assert!(machine.is_submitting());
    assert!(matches!(
        machine.begin_submission(&registrant(), &sample_slots()),
        Err(BookingError::SubmissionInProgress)
    ));
    assert!(matches!(machine.go_back(), Err(BookingError::SubmissionInProgress)));
    assert!(matches!(
        machine.set_timezone("Asia/Tokyo"),
        Err(BookingError::SubmissionInProgress)
    ));
    assert_eq!(machine.phase(), Phase::Registering);
}

#[test]
fn test_confirmed_is_terminal() {
    let mut machine = loaded_machine("Asia/Kolkata");
    registering(&mut machine);
    machine.begin_submission(&registrant(), &sample_slots()).unwrap();

    let confirmation = machine
        .complete_submission(Ok(BookingConfirmation {
            booking_id: "bk-1".to_string(),
        }))
        .unwrap();

    assert_eq!(confirmation.booking_id, "bk-1");
    assert_eq!(machine.phase(), Phase::Confirmed);
    assert!(matches!(
        machine.select_date(date(6, 3)),
        Err(BookingError::InvalidTransition {
            phase: Phase::Confirmed,
            ..
        })
    ));
    assert!(matches!(
        machine.begin_fetch(),
        Err(BookingError::InvalidTransition { .. })
    ));
}

#[test]
fn test_failed_submission_keeps_registering_and_key() {
    let mut machine = loaded_machine("Asia/Kolkata");
    registering(&mut machine);
    let first = machine.begin_submission(&registrant(), &sample_slots()).unwrap();

    let result = machine.complete_submission(Err(eyre!("slot already taken")));

    assert!(matches!(
        &result,
        Err(BookingError::Submission(msg)) if msg.contains("slot already taken")
    ));
    assert_eq!(machine.phase(), Phase::Registering);
    assert!(!machine.is_submitting());

    let retry = machine.begin_submission(&registrant(), &sample_slots()).unwrap();
    assert_eq!(retry.idempotency_key, first.idempotency_key);
}

#[test]
fn test_new_selection_gets_new_idempotency_key() {
    let mut machine = loaded_machine("Asia/Kolkata");
    registering(&mut machine);
    let first = machine.begin_submission(&registrant(), &sample_slots()).unwrap();
    machine
        .complete_submission(Err(eyre!("service unavailable")))
        .unwrap_err();

    machine.go_back().unwrap();
    machine.select_date(date(6, 3)).unwrap();
    machine.select_time("14:30-15:30").unwrap();
    let second = machine.begin_submission(&registrant(), &sample_slots()).unwrap();

    assert_ne!(second.idempotency_key, first.idempotency_key);
    assert_eq!(second.counselor_id, "c-3");
}

#[test]
fn test_every_offered_zone_keeps_selection_resolvable() {
    let mut machine = loaded_machine("Asia/Kolkata");

    for zone in ZONE_OPTIONS {
        machine.set_timezone(zone.id).unwrap();
        assert_eq!(machine.state().selected_pair(), None, "{}", zone.id);

        let Some(date) = machine.accept_suggestion().unwrap() else {
            continue;
        };
        let time = machine.index().display_times(date)[0].to_string();
        machine.select_time(&time).unwrap();

        let selected = machine.selected_slot().unwrap();
        assert_eq!(selected.local_date, date, "{}", zone.id);
        assert_eq!(selected.display_time, time, "{}", zone.id);

        machine.go_back().unwrap();
    }
}
