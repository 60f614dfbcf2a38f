use crate::error::{TtsError, TtsResult};
use crate::{SpeechSynthesizer, SynthesizedAudio};
use async_trait::async_trait;
use vesper_audio::playback::pcm_bytes_to_samples;

const OUTPUT_FORMAT: &str = "raw-16khz-16bit-mono-pcm";
const OUTPUT_SAMPLE_RATE: u32 = 16_000;

/// Speech synthesis over the Azure Cognitive Services TTS endpoint.
pub struct HttpTtsClient {
    http: reqwest::Client,
    endpoint: String,
    subscription_key: String,
    voice_name: String,
}

impl HttpTtsClient {
    pub fn new(subscription_key: String, region: &str, voice_name: String) -> Self {
        let endpoint = format!("https://{region}.tts.speech.microsoft.com/cognitiveservices/v1");
        Self::with_endpoint(subscription_key, endpoint, voice_name)
    }

    pub fn with_endpoint(subscription_key: String, endpoint: String, voice_name: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            subscription_key,
            voice_name,
        }
    }

    fn build_ssml(&self, text: &str) -> String {
        format!(
            "<speak version='1.0' xml:lang='en-US'>\
             <voice name='{}'>{}</voice>\
             </speak>",
            self.voice_name,
            escape_xml(text)
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpTtsClient {
    async fn synthesize(&self, text: &str) -> TtsResult<SynthesizedAudio> {
        let ssml = self.build_ssml(text);

        tracing::debug!(
            chars = text.len(),
            voice = %self.voice_name,
            "Requesting speech synthesis"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header("User-Agent", "vesper")
            .body(ssml)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(SynthesizedAudio {
            samples: pcm_bytes_to_samples(&bytes),
            sample_rate: OUTPUT_SAMPLE_RATE,
        })
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssml_wraps_voice_and_escapes_text() {
        let client = HttpTtsClient::with_endpoint(
            "key".into(),
            "http://localhost/tts".into(),
            "en-US-GuyNeural".into(),
        );
        let ssml = client.build_ssml("Tom & Jerry <live>");

        assert!(ssml.contains("<voice name='en-US-GuyNeural'>"));
        assert!(ssml.contains("Tom &amp; Jerry &lt;live&gt;"));
        assert!(ssml.starts_with("<speak"));
        assert!(ssml.ends_with("</speak>"));
    }

    #[test]
    fn escape_handles_quotes() {
        assert_eq!(escape_xml(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(escape_xml("it's"), "it&apos;s");
    }
}
