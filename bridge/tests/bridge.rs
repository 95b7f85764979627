use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clipboard_bridge::{
    Bitmap, BridgeError, ClipboardBackend, ClipboardBridge, ClipboardData, ClipboardDataType, ClipboardManager,
    ClipboardSource, EventEmitter, EventSink, EventSource, InlineExecutor, MemoryClipboard, NoSource,
    Payload, PollingSource, RetryPolicy, SyntheticEventSource, ThreadExecutor, BITMAP, FILE_DROP, UNICODE_TEXT,
};
use tokio::sync::broadcast::error::TryRecvError;

fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(20, Duration::from_millis(1))
}

fn bridge_over(clipboard: &Arc<MemoryClipboard>) -> (ClipboardBridge, EventEmitter) {
    let source = SyntheticEventSource::new();
    let emitter = source.emitter();
    let bridge = ClipboardBridge::builder(clipboard.clone())
        .executor(ThreadExecutor::default())
        .resolver(NoSource)
        .retry_policy(quick_retry())
        .event_source(source)
        .build()
        .unwrap();
    (bridge, emitter)
}

#[test]
fn text_round_trip() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);

    bridge.set_clipboard_data(Some(&ClipboardData::text("hello"))).unwrap();

    assert_eq!(bridge.get_clipboard_data_type().unwrap(), ClipboardDataType::Text);
    let data = bridge.get_clipboard_data().unwrap().unwrap();
    assert_eq!(data.as_text(), Some("hello"));
    assert_eq!(data.formats(), vec![UNICODE_TEXT.to_string()]);
    assert_eq!(data.source(), None);
    assert!(!bridge.is_clipboard_empty().unwrap());
    assert_eq!(clipboard.flushes(), 1);
}

#[test]
fn cleared_clipboard_reads_as_empty() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);
    bridge.set_clipboard_data(Some(&ClipboardData::text("soon gone"))).unwrap();

    bridge.clear_clipboard().unwrap();

    assert!(bridge.is_clipboard_empty().unwrap());
    assert_eq!(bridge.get_clipboard_data_type().unwrap(), ClipboardDataType::Unknown);
    assert_eq!(bridge.get_clipboard_data().unwrap(), None);
}

#[test]
fn setting_nothing_clears() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);
    bridge.set_clipboard_data(Some(&ClipboardData::text("x"))).unwrap();

    bridge.set_clipboard_data(None).unwrap();

    assert!(bridge.is_clipboard_empty().unwrap());
}

#[test]
fn recovers_from_transient_contention() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);
    clipboard.fail_next(3);

    bridge.set_clipboard_data(Some(&ClipboardData::text("persistent"))).unwrap();

    assert_eq!(clipboard.writes(), 1);
    assert_eq!(clipboard.attempts(), 5);
    assert_eq!(
        bridge.get_clipboard_data().unwrap().and_then(|d| d.as_text().map(str::to_string)),
        Some("persistent".to_string())
    );
}

#[test]
fn exhausted_retries_fall_back_to_defaults() {
    let clipboard = Arc::new(MemoryClipboard::new());
    clipboard.write_text("unreachable").unwrap();
    let bridge = ClipboardBridge::builder(clipboard.clone())
        .executor(InlineExecutor)
        .resolver(NoSource)
        .retry_policy(RetryPolicy::new(4, Duration::ZERO))
        .event_source(SyntheticEventSource::new())
        .build()
        .unwrap();

    clipboard.fail_next(4);
    assert_eq!(bridge.get_clipboard_data().unwrap(), None);
    clipboard.fail_next(4);
    assert_eq!(bridge.get_clipboard_data_type().unwrap(), ClipboardDataType::Unknown);
    clipboard.fail_next(4);
    assert!(bridge.is_clipboard_empty().unwrap());

    clipboard.fail_next(4);
    bridge.set_clipboard_data(Some(&ClipboardData::text("dropped"))).unwrap();
    assert_eq!(clipboard.writes(), 0);
    clipboard.fail_next(4);
    bridge.clear_clipboard().unwrap();

    assert_eq!(bridge.get_clipboard_data_type().unwrap(), ClipboardDataType::Text);
}

#[test]
fn platform_failure_is_unexpected() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);
    clipboard.fail_fatally("clipboard owner crashed");

    let err = bridge.get_clipboard_data().unwrap_err();
    assert!(matches!(err, BridgeError::Unexpected(_)));
    assert_eq!(clipboard.attempts(), 1);
}

#[test]
fn empty_path_list_round_trips() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);

    bridge.set_clipboard_data(Some(&ClipboardData::path_list(Vec::<String>::new()))).unwrap();

    let data = bridge.get_clipboard_data().unwrap().unwrap();
    assert_eq!(data.data_type(), ClipboardDataType::PathList);
    assert_eq!(data.as_path_list(), Some(&[][..]));
    assert_eq!(data.formats(), vec![FILE_DROP.to_string()]);
}

#[test]
fn image_round_trips() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);
    let bitmap = Bitmap::from_rgba(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap();

    bridge.set_clipboard_data(Some(&ClipboardData::image(bitmap.clone()))).unwrap();

    let data = bridge.get_clipboard_data().unwrap().unwrap();
    assert_eq!(data.data_type(), ClipboardDataType::Image);
    assert_eq!(data.as_image(), Some(&bitmap));
}

#[test]
fn unknown_formats_round_trip() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);
    clipboard.put_raw("Rich Text Format", b"{\\rtf1 hi}".to_vec());
    clipboard.add_raw("Locale", vec![9, 4, 0, 0]);

    let data = bridge.get_clipboard_data().unwrap().unwrap();
    assert_eq!(data.data_type(), ClipboardDataType::Unknown);
    assert_eq!(data.as_bytes(), Some(&b"{\\rtf1 hi}"[..]));
    assert_eq!(data.formats(), vec!["Rich Text Format".to_string(), "Locale".to_string()]);

    bridge.clear_clipboard().unwrap();
    bridge.set_clipboard_data(Some(&data)).unwrap();
    assert_eq!(clipboard.formats().unwrap(), vec!["Rich Text Format".to_string()]);
    assert_eq!(clipboard.read_raw("Rich Text Format").unwrap(), Some(b"{\\rtf1 hi}".to_vec()));
}

#[test]
fn unknown_image_is_written_as_an_image() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);
    let bitmap = Bitmap::from_rgba(1, 1, vec![0, 128, 255, 255]).unwrap();

    bridge.set_clipboard_data(Some(&ClipboardData::unknown(Payload::Image(bitmap.clone())))).unwrap();

    let data = bridge.get_clipboard_data().unwrap().unwrap();
    assert_eq!(data.data_type(), ClipboardDataType::Image);
    assert_eq!(data.as_image(), Some(&bitmap));
}

#[test]
fn raw_bytes_under_a_canonical_tag_are_rejected() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);
    let data = ClipboardData::unknown(Payload::Bytes(vec![1, 2, 3])).with_formats([BITMAP]);

    let err = bridge.set_clipboard_data(Some(&data)).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidArgument(_)));
    assert_eq!(clipboard.writes(), 0);
}

#[test]
fn update_raises_one_event() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, emitter) = bridge_over(&clipboard);
    let mut events = bridge.subscribe().unwrap();

    clipboard.write_text("copied elsewhere").unwrap();
    assert!(emitter.emit());

    let data = events.try_recv().unwrap().into_data();
    assert_eq!(data.as_text(), Some("copied elsewhere"));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn burst_of_updates_is_debounced() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, emitter) = bridge_over(&clipboard);
    let mut events = bridge.subscribe().unwrap();

    clipboard.write_text("once").unwrap();
    emitter.emit();
    emitter.emit();

    assert!(events.try_recv().is_ok());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn update_after_window_is_processed() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let source = SyntheticEventSource::new();
    let emitter = source.emitter();
    let bridge = ClipboardBridge::builder(clipboard.clone())
        .executor(InlineExecutor)
        .resolver(NoSource)
        .debounce(Duration::from_millis(20))
        .event_source(source)
        .build()
        .unwrap();
    let mut events = bridge.subscribe().unwrap();

    clipboard.write_text("first").unwrap();
    emitter.emit();
    std::thread::sleep(Duration::from_millis(40));
    clipboard.write_text("second").unwrap();
    emitter.emit();

    assert_eq!(events.try_recv().unwrap().data().as_text(), Some("first"));
    assert_eq!(events.try_recv().unwrap().data().as_text(), Some("second"));
}

#[test]
fn stopped_bridge_raises_nothing() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, emitter) = bridge_over(&clipboard);
    let mut events = bridge.subscribe().unwrap();
    assert!(bridge.is_monitoring());

    bridge.stop_monitoring().unwrap();
    clipboard.write_text("ignored").unwrap();
    emitter.emit();
    assert!(!bridge.is_monitoring());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    bridge.start_monitoring().unwrap();
    emitter.emit();
    assert_eq!(events.try_recv().unwrap().data().as_text(), Some("ignored"));
}

#[test]
fn empty_update_raises_nothing() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, emitter) = bridge_over(&clipboard);
    let mut events = bridge.subscribe().unwrap();

    emitter.emit();

    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn events_carry_the_resolved_source() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let source = SyntheticEventSource::new();
    let emitter = source.emitter();
    let lookups = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&lookups);
    let bridge = ClipboardBridge::builder(clipboard.clone())
        .resolver(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            ClipboardSource::new("notepad").ok().map(|s| s.with_icon_path("C:/Windows/notepad.exe"))
        })
        .retry_policy(quick_retry())
        .event_source(source)
        .build()
        .unwrap();
    let mut events = bridge.subscribe().unwrap();

    clipboard.write_text("from notepad").unwrap();
    emitter.emit();

    let event = events.try_recv().unwrap();
    let source = event.data().source().unwrap();
    assert_eq!(source.app_name(), "notepad");
    assert_eq!(source, &ClipboardSource::new("notepad").unwrap());

    assert!(bridge.get_clipboard_data().unwrap().unwrap().source().is_none());
    assert_eq!(lookups.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_attribution_still_raises() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let source = SyntheticEventSource::new();
    let emitter = source.emitter();
    let bridge = ClipboardBridge::builder(clipboard.clone())
        .resolver(|| -> Option<ClipboardSource> { panic!("access denied") })
        .retry_policy(quick_retry())
        .event_source(source)
        .build()
        .unwrap();
    let mut events = bridge.subscribe().unwrap();

    clipboard.write_text("x").unwrap();
    emitter.emit();

    let event = events.try_recv().unwrap();
    assert_eq!(event.data().as_text(), Some("x"));
    assert!(event.data().source().is_none());
}

#[test]
fn disposed_bridge_refuses_calls() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, emitter) = bridge_over(&clipboard);

    bridge.dispose();
    bridge.dispose();

    assert!(bridge.is_disposed());
    assert!(!bridge.is_monitoring());
    assert!(!emitter.emit());
    assert!(matches!(bridge.get_clipboard_data(), Err(BridgeError::Disposed)));
    assert!(matches!(bridge.set_clipboard_data(None), Err(BridgeError::Disposed)));
    assert!(matches!(bridge.get_clipboard_data_type(), Err(BridgeError::Disposed)));
    assert!(matches!(bridge.clear_clipboard(), Err(BridgeError::Disposed)));
    assert!(matches!(bridge.is_clipboard_empty(), Err(BridgeError::Disposed)));
    assert!(matches!(bridge.start_monitoring(), Err(BridgeError::Disposed)));
    assert!(matches!(bridge.stop_monitoring(), Err(BridgeError::Disposed)));
    assert!(matches!(bridge.subscribe(), Err(BridgeError::Disposed)));
}

struct RefusingSource;

impl EventSource for RefusingSource {
    fn subscribe(&mut self, _sink: EventSink) -> clipboard_bridge::Result<()> {
        Err(BridgeError::Registration("listener chain unavailable".to_string()))
    }

    fn unsubscribe(&mut self) {}
}

#[test]
fn registration_failure_fails_construction() {
    let result = ClipboardBridge::builder(Arc::new(MemoryClipboard::new()))
        .event_source(RefusingSource)
        .build();
    assert!(matches!(result, Err(BridgeError::Registration(_))));
}

#[test]
fn polling_source_drives_events() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let poller = PollingSource::new(clipboard.clone(), Duration::from_millis(10)).unwrap();
    let bridge = ClipboardBridge::builder(clipboard.clone())
        .resolver(NoSource)
        .retry_policy(quick_retry())
        .event_source(poller)
        .build()
        .unwrap();
    let mut events = bridge.subscribe().unwrap();

    clipboard.write_text("polled").unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    let event = loop {
        match events.try_recv() {
            Ok(event) => break event,
            Err(TryRecvError::Empty) if std::time::Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(err) => panic!("no clipboard event: {:?}", err),
        }
    };
    assert_eq!(event.data().as_text(), Some("polled"));
    drop(bridge);
}

#[test]
fn typed_tag_mismatch_is_rejected() {
    let err = ClipboardData::new(Payload::Text("x".into()), ClipboardDataType::PathList).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidArgument(_)));
}

#[tokio::test]
async fn async_variants_match_sync_results() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);

    bridge.set_clipboard_data_async(Some(ClipboardData::text("async"))).await.unwrap();
    assert_eq!(bridge.get_clipboard_data_type_async().await.unwrap(), ClipboardDataType::Text);
    assert!(!bridge.is_clipboard_empty_async().await.unwrap());
    let data = bridge.get_clipboard_data_async().await.unwrap().unwrap();
    assert_eq!(data.as_text(), Some("async"));

    bridge.clear_clipboard_async().await.unwrap();
    assert!(bridge.is_clipboard_empty_async().await.unwrap());
    assert_eq!(bridge.get_clipboard_data_async().await.unwrap(), None);
}

#[tokio::test]
async fn async_variants_report_disposal() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let (bridge, _) = bridge_over(&clipboard);
    bridge.dispose();
    assert!(matches!(bridge.get_clipboard_data_async().await, Err(BridgeError::Disposed)));
    assert!(matches!(bridge.set_clipboard_data_async(None).await, Err(BridgeError::Disposed)));
}
