//! End-to-end routing scenarios through the umbrella crate.
//!
//! Run with:
//! ```bash
//! cargo test -p midibay --test scenarios
//! ```

use midibay::prelude::*;
use midibay::{describe, RouterSnapshot};
use std::time::{Duration, Instant};

const KEYS: EndpointId = EndpointId(1);
const PADS: EndpointId = EndpointId(2);
const SYNTH: EndpointId = EndpointId(10);
const DRUMS: EndpointId = EndpointId(11);

/// Two controllers, two sound modules, keys to both, pads to drums.
fn studio() -> Result<(MidiRouter, MemorySink, MemorySink)> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let router = MidiRouter::builder().build()?;
    let synth = MemorySink::new();
    let drums = MemorySink::new();

    router.attach_input(Endpoint::input(1, "Keys"))?;
    router.attach_input(Endpoint::input(2, "Pads"))?;
    router.attach_output(Endpoint::output(10, "Synth"), synth.clone())?;
    router.attach_output(Endpoint::output(11, "Drums"), drums.clone())?;

    router.toggle_edge(KEYS, SYNTH)?;
    router.toggle_edge(KEYS, DRUMS)?;
    router.toggle_edge(PADS, DRUMS)?;
    router.drain_events();
    Ok((router, synth, drums))
}

#[test]
fn test_cc_blocked_at_source_note_reaches_both() -> Result<()> {
    let (router, synth, drums) = studio()?;
    router.set_filter(FilterScope::Endpoint(KEYS), Classifier::CONTROL_CHANGE, true)?;

    assert_eq!(router.dispatch(KEYS, &[0xB0, 1, 2])?, DispatchOutcome::Filtered);
    assert_eq!(
        router.dispatch(KEYS, &[0x90, 60, 100])?,
        DispatchOutcome::Routed { delivered: 2 }
    );
    assert_eq!(synth.sent(), vec![vec![0x90, 60, 100]]);
    assert_eq!(drums.sent(), vec![vec![0x90, 60, 100]]);
    Ok(())
}

#[test]
fn test_global_channel_three_only() -> Result<()> {
    let (router, synth, drums) = studio()?;
    router.set_channel(FilterScope::Global, ChannelRule::filter(3)?)?;

    assert_eq!(router.dispatch(KEYS, &[0x90, 60, 100])?, DispatchOutcome::Filtered);
    assert_eq!(router.dispatch(PADS, &[0x90, 36, 100])?, DispatchOutcome::Filtered);
    router.dispatch(KEYS, &[0x92, 60, 100])?;

    assert_eq!(synth.sent(), vec![vec![0x92, 60, 100]]);
    assert_eq!(drums.sent(), vec![vec![0x92, 60, 100]]);
    Ok(())
}

#[test]
fn test_drums_remapped_to_channel_ten() -> Result<()> {
    let (router, synth, drums) = studio()?;
    router.set_channel(FilterScope::Endpoint(DRUMS), ChannelRule::reset(10)?)?;

    router.dispatch(PADS, &[0x90, 36, 127])?;
    router.dispatch(KEYS, &[0x80, 64, 0])?;

    assert_eq!(drums.sent(), vec![vec![0x99, 36, 127], vec![0x89, 64, 0]]);
    assert_eq!(synth.sent(), vec![vec![0x80, 64, 0]]);
    Ok(())
}

#[test]
fn test_monitor_text() -> Result<()> {
    let (router, _synth, _drums) = studio()?;
    router.set_alias(KEYS, Some("Stage Piano".to_string()))?;
    router.dispatch(KEYS, &[0x90, 60, 100])?;

    let first = router.drain_events().into_iter().next();
    match first {
        Some(RouterEvent::Message { name, text, filtered, .. }) => {
            assert_eq!(name, "Stage Piano");
            assert_eq!(text, describe(&[0x90, 60, 100]));
            assert!(text.contains("C4"));
            assert!(!filtered);
        }
        other => panic!("expected a message event, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_echoing_device_is_contained() -> Result<()> {
    let (router, synth, _drums) = studio()?;
    let t0 = Instant::now();

    // The synth echoes its input straight back through the keys port
    for i in 0..5u32 {
        router.dispatch_at(KEYS, &[0x90, 60, 100], t0 + Duration::from_millis(u64::from(i) * 2))?;
    }
    assert_eq!(synth.sent_count(), 1);

    let warnings: Vec<_> = router
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, RouterEvent::LoopWarning { .. }))
        .collect();
    assert_eq!(warnings.len(), 2);
    Ok(())
}

#[test]
fn test_session_restore_across_new_ids() -> Result<()> {
    let (router, _synth, _drums) = studio()?;
    router.set_filter(FilterScope::Global, Classifier::ACTIVE_SENSING, true)?;
    let saved = bincode::serialize(&router.snapshot()).expect("serialize snapshot");

    let restored: RouterSnapshot = bincode::deserialize(&saved).expect("deserialize snapshot");
    let next = MidiRouter::builder().build()?;
    next.restore(restored)?;
    next.attach_output(Endpoint::output(100, "Drums"), MemorySink::new())?;
    next.attach_input(Endpoint::input(200, "Pads"))?;

    assert!(next.is_routed(EndpointId(200), EndpointId(100))?);
    assert!(next
        .filter_set(FilterScope::Global)?
        .contains(&Classifier::ACTIVE_SENSING));
    Ok(())
}

#[test]
fn test_contract_violation_surfaces_as_error() {
    let (router, _synth, _drums) = studio().unwrap();
    let err = router.dispatch(SYNTH, &[0x90, 60, 100]).unwrap_err();
    let err: Error = err.into();
    assert!(matches!(err, Error::Router(_)));
}
