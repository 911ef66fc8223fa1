//! Integration tests for the voice cache and the synthesis context.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{FakeEngine, KAL_RATE, SAMPLES_PER_FRAME, WIDE_RATE};
use speechpipe::encoder::wav::WAV_HEADER_LEN;
use speechpipe::{
    AudioType, EncoderOptions, OutputFormat, SynthesisConfig, SynthesisContext, SynthesisError,
    VoiceCache,
};

#[test]
fn test_cache_loads_each_voice_once() {
    common::init_logging();
    let engine = FakeEngine::new();
    let cache = VoiceCache::new(Arc::clone(&engine), common::registry());
    assert!(cache.is_empty());

    let first = cache.get_or_load("kal").unwrap();
    let second = cache.get_or_load("kal").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.tracker.loads(), 1);

    cache.get_or_load("slt").unwrap();
    assert_eq!(cache.len(), 2);
    assert!(cache.contains("slt"));
    assert!(!cache.contains("kal16"));
    assert_eq!(engine.tracker.loads(), 2);
}

#[test]
fn test_cache_miss_on_unknown_voice() {
    let engine = FakeEngine::new();
    let cache = VoiceCache::new(Arc::clone(&engine), common::registry());

    assert!(matches!(
        cache.get_or_load("nonexistent"),
        Err(SynthesisError::NotFound(ref name)) if name == "nonexistent"
    ));
    assert!(cache.is_empty());
    assert_eq!(engine.tracker.loads(), 0);
}

#[test]
fn test_concurrent_requests_on_one_voice() {
    let engine = Arc::new(FakeEngine {
        frame_delay: Some(Duration::from_millis(2)),
        ..FakeEngine::default()
    });
    let cache = Arc::new(VoiceCache::new(Arc::clone(&engine), common::registry()));
    let text = "same words every time";

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let voice = cache.get_or_load("kal").unwrap();
                let mut sink = speechpipe::BufferSink::new();
                speechpipe::synthesize_with_voice(&voice, text, &OutputFormat::raw(), &mut sink)
                    .unwrap();
                sink.into_inner()
            })
        })
        .collect();
    let outputs: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(engine.tracker.loads(), 1);
    assert_eq!(engine.tracker.streams_started(), 6);
    assert_eq!(engine.tracker.max_open_streams(), 1, "one voice synthesizes one text at a time");
    for output in &outputs {
        assert_eq!(common::decode_pcm(output), common::expected_samples(text));
    }
}

#[test]
fn test_different_voices_run_in_parallel() {
    let engine = Arc::new(FakeEngine {
        frame_delay: Some(Duration::from_millis(20)),
        ..FakeEngine::default()
    });
    let cache = Arc::new(VoiceCache::new(Arc::clone(&engine), common::registry()));
    cache.get_or_load("kal").unwrap();
    cache.get_or_load("slt").unwrap();

    let handles: Vec<_> = ["kal", "slt"]
        .into_iter()
        .map(|name| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let voice = cache.get_or_load(name).unwrap();
                voice.synthesize("one two three four five").unwrap().count()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 5);
    }
    assert_eq!(engine.tracker.max_open_streams(), 2);
}

#[test]
fn test_slow_load_does_not_block_hits() {
    let engine = Arc::new(FakeEngine {
        load_delay: Some(Duration::from_millis(600)),
        ..FakeEngine::default()
    });
    let cache = Arc::new(VoiceCache::new(Arc::clone(&engine), common::registry()));
    cache.get_or_load("kal").unwrap();

    let loaders: Vec<_> = (0..3)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_or_load("slt").unwrap())
        })
        .collect();
    thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    cache.get_or_load("kal").unwrap();
    assert!(cache.contains("kal"));
    assert!(
        started.elapsed() < Duration::from_millis(300),
        "hit waited {:?} behind another voice's load",
        started.elapsed()
    );

    let slt: Vec<_> = loaders.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(slt.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(engine.tracker.loads(), 2, "slt loads once despite three racing requests");
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_failed_load_can_be_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("later.flitevox");
    std::fs::write(&path, "not yet").unwrap();
    let name = path.to_str().unwrap();

    let engine = FakeEngine::new();
    let cache = VoiceCache::new(Arc::clone(&engine), common::registry());
    assert!(matches!(
        cache.get_or_load(name),
        Err(SynthesisError::EngineLoad { .. })
    ));
    assert!(!cache.contains(name));

    std::fs::write(&path, "FAKEVOX later").unwrap();
    let voice = cache.get_or_load(name).unwrap();
    assert_eq!(voice.engine_name().as_deref(), Some("later"));
    assert!(cache.contains(name));
}

#[test]
fn test_shutdown_releases_everything() {
    let engine = FakeEngine::new();
    let cache = VoiceCache::new(Arc::clone(&engine), common::registry());
    let kal = cache.get_or_load("kal").unwrap();
    cache.get_or_load("kal16").unwrap();

    cache.shutdown();
    assert!(cache.is_empty());
    assert_eq!(engine.tracker.open_handles(), 0);
    assert!(matches!(
        kal.synthesize("too late"),
        Err(SynthesisError::UseAfterRelease(_))
    ));

    // A fresh lookup loads a new voice.
    let again = cache.get_or_load("kal").unwrap();
    assert!(!Arc::ptr_eq(&kal, &again));
    assert_eq!(engine.tracker.loads(), 3);
}

#[test]
fn test_context_default_voice() {
    let engine = FakeEngine::new();
    let context = SynthesisContext::new(Arc::clone(&engine), common::registry()).unwrap();

    assert_eq!(context.default_voice().name(), "kal");
    assert!(context.cache().contains("kal"));
    assert_eq!(context.list_available().len(), 3);
    assert_eq!(context.default_format(), &OutputFormat::wav());

    let bytes = context.speak("exactly two").unwrap();
    let reader = hound::WavReader::new(std::io::Cursor::new(&bytes)).unwrap();
    assert_eq!(reader.spec().sample_rate, KAL_RATE);
    assert_eq!(bytes.len(), WAV_HEADER_LEN + 2 * SAMPLES_PER_FRAME * 2);

    let slt = context.set_default_voice("slt").unwrap();
    assert!(Arc::ptr_eq(&slt, &context.default_voice()));
    let bytes = context.speak("exactly two").unwrap();
    let reader = hound::WavReader::new(std::io::Cursor::new(&bytes)).unwrap();
    assert_eq!(reader.spec().sample_rate, WIDE_RATE);

    assert!(matches!(
        context.set_default_voice("nobody"),
        Err(SynthesisError::NotFound(_))
    ));
    assert_eq!(context.default_voice().name(), "slt");
}

#[test]
fn test_context_to_speech() {
    let engine = FakeEngine::new();
    let context = SynthesisContext::new(Arc::clone(&engine), common::registry()).unwrap();

    let raw = context.to_speech("hello there", Some("kal16"), AudioType::Raw).unwrap();
    assert_eq!(common::decode_pcm(&raw), common::expected_samples("hello there"));
    assert!(context.cache().contains("kal16"));

    let wav = context.to_speech("hello there", None, AudioType::Wav).unwrap();
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(wav.len(), WAV_HEADER_LEN + raw.len());

    assert!(context.to_speech("", None, AudioType::Wav).unwrap().is_empty());

    let mp3 = context.to_speech("hello", None, AudioType::Mp3);
    if context.supported_audio_types().contains(&AudioType::Mp3) {
        assert!(!mp3.unwrap().is_empty());
    } else {
        assert!(matches!(mp3, Err(SynthesisError::UnsupportedFormat(_))));
    }
}

#[test]
fn test_context_speak_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("greeting.wav");
    let engine = FakeEngine::new();
    let context = SynthesisContext::new(Arc::clone(&engine), common::registry()).unwrap();

    let stats = context
        .speak_to_file("good morning to you", Some("slt"), &path, &OutputFormat::wav())
        .unwrap();
    assert_eq!(stats.frames, 4);
    assert_eq!(stats.bytes_written, std::fs::metadata(&path).unwrap().len());

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, WIDE_RATE);
    let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
    assert_eq!(samples, common::expected_samples("good morning to you"));
}

#[test]
fn test_rejected_speak_to_file_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keep.wav");
    std::fs::write(&path, b"previous recording, 27 byte").unwrap();
    let engine = FakeEngine::new();
    let context = SynthesisContext::new(Arc::clone(&engine), common::registry()).unwrap();

    assert!(matches!(
        context.speak_to_file("hello", Some("nobody"), &path, &OutputFormat::wav()),
        Err(SynthesisError::NotFound(_))
    ));
    assert_eq!(std::fs::read(&path).unwrap(), b"previous recording, 27 byte");

    let format = OutputFormat::new(AudioType::Wav, EncoderOptions::new().with("bogus", 1));
    assert!(matches!(
        context.speak_to_file("hello", None, &path, &format),
        Err(SynthesisError::UnsupportedOption { .. })
    ));
    assert_eq!(std::fs::read(&path).unwrap(), b"previous recording, 27 byte");
    assert_eq!(engine.tracker.streams_started(), 0);
}

#[test]
fn test_context_from_config() {
    let engine = FakeEngine::new();
    let config = SynthesisConfig::from_json_str(
        r#"{ "default_voice": "kal16", "audio_type": "raw", "preload_voices": ["slt"] }"#,
    )
    .unwrap();
    let context =
        SynthesisContext::with_config(Arc::clone(&engine), common::registry(), &config).unwrap();

    assert_eq!(context.cache().len(), 2);
    assert_eq!(context.default_voice().name(), "kal16");
    assert_eq!(context.default_format(), &OutputFormat::raw());

    let bytes = context.speak("raw words").unwrap();
    assert_eq!(bytes.len(), 2 * SAMPLES_PER_FRAME * 2);
}

#[test]
fn test_context_with_unknown_default_voice() {
    let engine = FakeEngine::new();
    let config = SynthesisConfig::builder()
        .default_voice("missing")
        .build()
        .unwrap();
    assert!(matches!(
        SynthesisContext::with_config(Arc::clone(&engine), common::registry(), &config),
        Err(SynthesisError::NotFound(_))
    ));
    assert_eq!(engine.tracker.open_handles(), 0);
}
