use tracing::debug;
use url::form_urlencoded;

use super::{parse_body, TranslateRequest};
use crate::error::{PanelError, Result};
use crate::llm::http::CurlCommand;
use crate::llm::types::non_blank;
use crate::llm::RequestSpec;

pub const MISSING_KEY: &str = "Please configure your DeepL API key";

const FREE_HOST: &str = "api-free.deepl.com";
const PRO_HOST: &str = "api.deepl.com";
/// 免费账户的 key 以 `:fx` 结尾
const FREE_KEY_SUFFIX: &str = ":fx";

pub struct DeepLTranslator;

impl DeepLTranslator {
    pub fn host_for(api_key: &str) -> &'static str {
        if api_key.ends_with(FREE_KEY_SUFFIX) {
            FREE_HOST
        } else {
            PRO_HOST
        }
    }

    /// 表单请求体：`text` 编码，`target_lang` 转为大写
    pub fn form_body(request: &TranslateRequest) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("text", &request.text)
            .append_pair("target_lang", &request.target_lang.to_uppercase())
            .finish()
    }

    pub fn build_command(request: &TranslateRequest, program: &str) -> Result<RequestSpec> {
        let api_key = non_blank(request.api_key.as_deref())
            .ok_or_else(|| PanelError::configuration(MISSING_KEY))?;

        let host = Self::host_for(api_key);
        let url = format!("https://{host}/v2/translate");
        let payload = Self::form_body(request);

        debug!(host, target_lang = %request.target_lang, "built deepl request");

        let args = CurlCommand::with_program(program)
            .silent()
            .method("POST")
            .url(url.clone())
            .header("Authorization", &format!("DeepL-Auth-Key {api_key}"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .data(payload.clone())
            .into_args();

        Ok(RequestSpec { url, payload, args })
    }

    /// `{"translations":[{"text":...}]}` 成功；`{"message":...}` 为 API 报错
    pub fn parse_response(body: &str) -> Result<String> {
        let json = parse_body(body)?;
        if let Some(text) = json["translations"][0]["text"].as_str() {
            return Ok(text.to_string());
        }
        if let Some(message) = json["message"].as_str().filter(|m| !m.is_empty()) {
            return Err(PanelError::Upstream(message.to_string()));
        }
        Err(PanelError::unknown_format())
    }
}
