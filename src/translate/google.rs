use tracing::debug;
use url::Url;

use super::{parse_body, TranslateRequest};
use crate::error::{PanelError, Result};
use crate::llm::http::CurlCommand;
use crate::llm::types::non_blank;
use crate::llm::RequestSpec;

const ENDPOINT: &str = "https://translate.google.com/translate_a/single";
const CLIENT_ID: &str = "gtx";

/// Google 翻译公共端点，无需 API key
pub struct GoogleTranslator;

impl GoogleTranslator {
    pub fn build_url(request: &TranslateRequest) -> Result<String> {
        let source = non_blank(request.source_lang.as_deref()).unwrap_or("auto");
        let url = Url::parse_with_params(
            ENDPOINT,
            &[
                ("client", CLIENT_ID),
                ("sl", source),
                ("tl", request.target_lang.as_str()),
                ("dt", "t"),
                ("q", request.text.as_str()),
            ],
        )
        .map_err(|e| PanelError::Other(anyhow::anyhow!("invalid translate url: {e}")))?;
        Ok(url.into())
    }

    pub fn build_command(request: &TranslateRequest, program: &str) -> Result<RequestSpec> {
        let url = Self::build_url(request)?;
        debug!(
            target_lang = %request.target_lang,
            chars = request.text.chars().count(),
            "built google translate request"
        );
        let args = CurlCommand::with_program(program)
            .silent()
            .url(url.clone())
            .into_args();
        Ok(RequestSpec {
            url,
            payload: String::new(),
            args,
        })
    }

    /// 响应是嵌套数组：`[[["译文","原文",...], ...], ...]`，按顺序拼接每段的第一个元素
    pub fn parse_response(body: &str) -> Result<String> {
        let json = parse_body(body)?;
        let text = json[0]
            .as_array()
            .map(|segments| {
                segments
                    .iter()
                    .filter_map(|segment| segment[0].as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_defaults_source_to_auto() {
        let url = GoogleTranslator::build_url(&TranslateRequest::new("hello world", "fr")).unwrap();
        assert_eq!(
            url,
            "https://translate.google.com/translate_a/single?client=gtx&sl=auto&tl=fr&dt=t&q=hello+world"
        );
    }

    #[test]
    fn test_text_is_encoded() {
        let request = TranslateRequest::new("a&b=c?", "de").with_source_lang("en");
        let url = GoogleTranslator::build_url(&request).unwrap();
        assert!(url.contains("&sl=en&"));
        assert!(url.ends_with("&q=a%26b%3Dc%3F"));
    }

    #[test]
    fn test_command_is_single_get() {
        let request = TranslateRequest::new("hi", "es");
        let spec = GoogleTranslator::build_command(&request, "curl").unwrap();
        assert_eq!(spec.args, vec!["curl".to_string(), "-s".to_string(), spec.url.clone()]);
        assert!(spec.payload.is_empty());
    }

    #[test]
    fn test_parse_concatenates_segments() {
        let body = r#"[[["Bonjour. ","Hello. ",null,null,1],["Au revoir","Goodbye",null,null,1]],null,"en"]"#;
        assert_eq!(GoogleTranslator::parse_response(body).unwrap(), "Bonjour. Au revoir");
    }

    #[test]
    fn test_parse_failure() {
        let err = GoogleTranslator::parse_response("<html>").unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse response");
    }
}
