use assistant_panel::{ChatBackend, ChatMessage, ChatRequest, MessageRole};
use serde_json::Value;

const GEMINI_TEMPLATE: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/{model}:streamGenerateContent?alt=sse&key={apiKey}";

fn history() -> Vec<ChatMessage> {
    vec![
        ChatMessage::user("What is Rust?"),
        ChatMessage::assistant("A systems language."),
        ChatMessage::system("context note"),
        ChatMessage::user("Tell me more"),
    ]
}

fn payload(payload: &str) -> Value {
    serde_json::from_str(payload).expect("payload is valid JSON")
}

#[test]
fn gemini_history_follows_synthetic_exchange() {
    let request = ChatRequest::new(GEMINI_TEMPLATE, "gemini-2.0-flash")
        .with_api_key("AIza-test")
        .with_system_prompt("Answer in French")
        .with_history(history());
    let spec = ChatBackend::Gemini.build_command(&request).unwrap();

    let json = payload(&spec.payload);
    let contents = json["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 2 + history().len());
    assert_eq!(contents[0]["parts"][0]["text"], "System instruction: Answer in French");
    assert_eq!(contents[1]["role"], "model");

    let roles: Vec<&str> = contents[2..]
        .iter()
        .map(|c| c["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["user", "model", "user", "user"]);
    let texts: Vec<&str> = contents[2..]
        .iter()
        .map(|c| c["parts"][0]["text"].as_str().unwrap())
        .collect();
    let expected: Vec<String> = history().into_iter().map(|m| m.content).collect();
    assert_eq!(texts, expected);
}

#[test]
fn gemini_without_system_prompt_has_only_history() {
    let request = ChatRequest::new(GEMINI_TEMPLATE, "gemini-2.0-flash")
        .with_api_key("AIza-test")
        .with_system_prompt("  \n")
        .with_history(vec![ChatMessage::user("hi")]);
    let spec = ChatBackend::Gemini.build_command(&request).unwrap();
    let json = payload(&spec.payload);
    assert_eq!(json["contents"].as_array().unwrap().len(), 1);
    assert_eq!(
        spec.url,
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse&key=AIza-test"
    );
    assert!(spec.args.contains(&"-d".to_string()));
    assert_eq!(spec.args.last(), Some(&spec.url));
}

#[test]
fn openai_authorization_iff_key_present() {
    let base = ChatRequest::new("http://localhost:11434/v1/chat/completions", "llama3.2")
        .with_history(history());

    for key in [None, Some(""), Some("   ")] {
        let mut request = base.clone();
        request.api_key = key.map(str::to_string);
        let spec = ChatBackend::OpenAi.build_command(&request).unwrap();
        assert!(
            spec.args.iter().all(|arg| !arg.contains("Authorization")),
            "unexpected auth header for key {key:?}"
        );
    }

    let spec = ChatBackend::OpenAi
        .build_command(&base.clone().with_api_key("sk-live"))
        .unwrap();
    let auth: Vec<_> = spec
        .args
        .iter()
        .filter(|arg| arg.contains("Authorization"))
        .collect();
    assert_eq!(auth, vec!["Authorization: Bearer sk-live"]);
    assert_eq!(spec.url, "http://localhost:11434/v1/chat/completions");
}

#[test]
fn openai_messages_pass_through_unchanged() {
    let request = ChatRequest::new("https://api.openai.com/v1/chat/completions", "gpt-4o")
        .with_system_prompt("You are terse")
        .with_history(history())
        .with_temperature(1.2);
    let spec = ChatBackend::OpenAi.build_command(&request).unwrap();
    let json = payload(&spec.payload);

    let messages: Vec<ChatMessage> = serde_json::from_value(json["messages"].clone()).unwrap();
    assert_eq!(messages[0], ChatMessage::new(MessageRole::System, "You are terse"));
    assert_eq!(&messages[1..], history().as_slice());
    assert_eq!(json["temperature"], 1.2);
    assert_eq!(json["stream"], true);
}

#[test]
fn custom_program_is_first_argument() {
    let request = ChatRequest::new("http://localhost/v1/chat/completions", "m");
    let spec = ChatBackend::OpenAi
        .build_command_with(&request, "/opt/curl/bin/curl")
        .unwrap();
    assert_eq!(spec.args[0], "/opt/curl/bin/curl");
}
