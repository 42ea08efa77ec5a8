#![no_main]
use libfuzzer_sys::fuzz_target;
use sentinel_core::response::ResponseStrategy;
use sentinel_types::DetectionType;

const TYPES: [DetectionType; 6] = [
    DetectionType::PromptInjection,
    DetectionType::SocialEngineering,
    DetectionType::PrivilegeEscalation,
    DetectionType::DataExfiltration,
    DetectionType::Evasion,
    DetectionType::Trust,
];

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let Ok(model_reply) = std::str::from_utf8(&data[1..]) else { return };

    let detection_type = TYPES[data[0] as usize % TYPES.len()];
    let prior_honeypot_turns = u32::from(data[0]);
    let strategy = ResponseStrategy::new();

    // Should never panic on arbitrary model output, and must always
    // return a non-empty reply.
    let reply = strategy.choose_reply(None, Some(model_reply.to_string()), detection_type, prior_honeypot_turns, &[]);
    assert!(!reply.is_empty());
});
