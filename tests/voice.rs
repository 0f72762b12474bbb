//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;
use std::sync::Arc;

use lia_companion::voice::{
    CAPTURE_SAMPLE_RATE, InputEffect, ListenMode, RecognitionEvent, RecognitionEventKind,
    RecognitionResult, SpeechInput, SpeechInputSettings, SpeechOutput, UtteranceSegmenter,
    clean_for_speech, samples_to_wav,
};

mod common;

use common::{FakeRecognizer, FixedSynth, RecordingSink};

/// Generate sine wave audio samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (CAPTURE_SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / CAPTURE_SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (CAPTURE_SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

fn final_result(session: u64, transcript: &str) -> RecognitionEvent {
    RecognitionEvent {
        session,
        kind: RecognitionEventKind::Results {
            results: vec![RecognitionResult::final_(transcript)],
            result_index: 0,
        },
    }
}

#[test]
fn test_clean_for_speech_example() {
    assert_eq!(
        clean_for_speech("**Hello** [world](http://x.com)!", 1000),
        "Hello world!"
    );
}

#[tokio::test]
async fn test_speech_output_plays_and_clears_flag() {
    let synth = Arc::new(FixedSynth::silence());
    let sink = Arc::new(RecordingSink::default());
    let speech = SpeechOutput::new(synth.clone(), sink.clone(), 1000);

    assert!(speech.speak("*Good evening*, madam.").await);
    assert!(!speech.is_speaking());
    assert_eq!(sink.count(), 1);
    assert_eq!(*synth.calls.lock().unwrap(), vec!["Good evening, madam."]);
    assert_eq!(sink.played.lock().unwrap()[0].sample_rate, 24000);
}

#[tokio::test]
async fn test_speech_output_degrades_to_silence() {
    let sink = Arc::new(RecordingSink::default());
    let speech = SpeechOutput::new(Arc::new(FixedSynth::failing()), sink.clone(), 1000);

    assert!(!speech.speak("Hello").await);
    assert!(!speech.is_speaking());
    assert_eq!(sink.count(), 0);
}

#[tokio::test]
async fn test_speech_output_skips_unspeakable_text() {
    let synth = Arc::new(FixedSynth::silence());
    let speech = SpeechOutput::new(synth.clone(), Arc::new(RecordingSink::default()), 1000);

    assert!(!speech.speak("*** ~~ ###").await);
    assert!(synth.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_speech_output_without_audio_payload() {
    let synth = Arc::new(FixedSynth {
        payload: None,
        ..FixedSynth::silence()
    });
    let sink = Arc::new(RecordingSink::default());
    let speech = SpeechOutput::new(synth, sink.clone(), 1000);

    assert!(!speech.speak("Hello").await);
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_wake_listening_stops_dictation_first() {
    let mut input = SpeechInput::new(FakeRecognizer::default(), SpeechInputSettings::default());

    input.toggle_dictation().unwrap();
    assert_eq!(input.mode(), ListenMode::Dictating);

    input.toggle_wake_listening().unwrap();
    assert_eq!(input.mode(), ListenMode::WakeListening);
    assert_eq!(input.recognizer().stops, 1);
    assert_eq!(input.recognizer().starts, vec![1, 2]);

    // A late result from the dictation session changes nothing
    assert_eq!(input.handle(final_result(1, "lia")), InputEffect::None);
    assert_eq!(input.mode(), ListenMode::WakeListening);
}

#[test]
fn test_wake_word_to_dictated_transcript() {
    let settings = SpeechInputSettings {
        wake_word: "Nova".to_string(),
        ..SpeechInputSettings::default()
    };
    let mut input = SpeechInput::new(FakeRecognizer::default(), settings);

    input.toggle_wake_listening().unwrap();
    assert!(matches!(
        input.handle(final_result(1, "okay nova")),
        InputEffect::WakeWordHeard { .. }
    ));

    assert!(input.begin_dictation().unwrap());
    assert_eq!(
        input.handle(final_result(2, "remind me to call mum")),
        InputEffect::Transcript("remind me to call mum".to_string())
    );
    assert_eq!(input.mode(), ListenMode::Idle);
}

#[test]
fn test_segmented_utterance_encodes_as_wav() {
    let mut segmenter = UtteranceSegmenter::new();

    let mut utterance = None;
    let audio = [
        generate_silence(0.2),
        generate_sine_samples(220.0, 0.6, 0.5),
        generate_silence(1.0),
    ]
    .concat();
    for block in audio.chunks(1600) {
        if let Some(done) = segmenter.push(block) {
            utterance = Some(done);
        }
    }

    let utterance = utterance.expect("utterance should close after trailing silence");
    let wav = samples_to_wav(&utterance, CAPTURE_SAMPLE_RATE).unwrap();

    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, CAPTURE_SAMPLE_RATE);
    assert_eq!(spec.channels, 1);
    assert_eq!(reader.len() as usize, utterance.len());
}
