//! Template fill: the `get` and `submit` actions.

use std::collections::HashMap;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::docx;
use crate::error::FunctionError;
use crate::models::document_template::{CustomField, Model as TemplateModel};
use crate::repositories::{NewSignatureRequest, NewSigner, SignatureRepository, TemplateRepository};
use crate::storage::ObjectStore;

const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DEFAULT_ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";
const MAX_ATTACHMENTS: usize = 10;
const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;
const SIGNER_TOKEN_BYTES: usize = 32;

/// Template as shown to someone opening the public link.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TemplateView {
    pub id: Uuid,
    pub name: String,
    /// Time-limited download link for the `.docx`
    pub download_url: String,
    pub custom_fields: Vec<CustomField>,
}

/// Person who will sign the rendered document.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignerInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub cpf: Option<String>,
}

/// A file uploaded together with the filled form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttachmentInput {
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Standard base64 of the file content
    pub content_base64: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitInput {
    pub token: String,
    /// Field values keyed by placeholder name
    #[serde(default)]
    #[schema(value_type = Object)]
    pub values: Map<String, JsonValue>,
    pub signer: SignerInput,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubmitOutcome {
    pub signature_request_id: Uuid,
    /// Token the signer uses to request a verification code and sign
    pub signer_token: String,
}

pub struct TemplateFillService<'a> {
    db: &'a DatabaseConnection,
    store: &'a dyn ObjectStore,
    signed_url_ttl: Duration,
}

impl<'a> TemplateFillService<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        store: &'a dyn ObjectStore,
        signed_url_ttl: Duration,
    ) -> Self {
        Self {
            db,
            store,
            signed_url_ttl,
        }
    }

    async fn active_template(&self, token: &str) -> Result<TemplateModel, FunctionError> {
        if token.trim().is_empty() {
            return Err(FunctionError::Validation("token is required".to_string()));
        }

        TemplateRepository::new(self.db)
            .find_active_by_token(token.trim())
            .await?
            .ok_or_else(|| FunctionError::NotFound("template not found or inactive".to_string()))
    }

    #[instrument(skip_all)]
    pub async fn get(&self, token: &str) -> Result<TemplateView, FunctionError> {
        let template = self.active_template(token).await?;
        let download_url = self
            .store
            .signed_url(&template.storage_path, self.signed_url_ttl)
            .await?;

        Ok(TemplateView {
            id: template.id,
            name: template.name.clone(),
            download_url,
            custom_fields: template.fields(),
        })
    }

    #[instrument(skip_all, fields(template_id))]
    pub async fn submit(
        &self,
        input: SubmitInput,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome, FunctionError> {
        let template = self.active_template(&input.token).await?;
        tracing::Span::current().record("template_id", tracing::field::display(template.id));

        let values = field_values(&input.values);
        check_required_fields(&template.fields(), &values)?;
        let signer = validate_signer(&input.signer)?;
        let attachments = decode_attachments(&input.attachments)?;

        let source = self.store.download(&template.storage_path).await?;
        let rendered = docx::render_docx(&source, &values)?;

        let request_id = Uuid::new_v4();
        let prefix = format!("signatures/{request_id}");
        let document_path = format!("{prefix}/{}.docx", slugify(&template.name));
        self.store
            .upload(&document_path, rendered, DOCX_CONTENT_TYPE)
            .await?;

        let mut attachment_paths = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let path = format!("{prefix}/attachments/{}", attachment.file_name);
            self.store
                .upload(&path, attachment.bytes, &attachment.content_type)
                .await?;
            attachment_paths.push(path);
        }

        let signer_token = generate_token();
        let (request, _) = SignatureRepository::new(self.db)
            .create_with_signer(
                NewSignatureRequest {
                    id: request_id,
                    document_name: format!("{} - {}", template.name, signer.name),
                    document_path,
                    template_id: Some(template.id),
                    attachments: attachment_paths,
                    created_by: template.created_by,
                },
                NewSigner {
                    token: signer_token.clone(),
                    ..signer
                },
                now,
            )
            .await?;

        info!(signature_request_id = %request.id, "Opened signature request from template");

        Ok(SubmitOutcome {
            signature_request_id: request.id,
            signer_token,
        })
    }
}

/// Flattens submitted JSON values to the text placed in the document.
fn field_values(values: &Map<String, JsonValue>) -> HashMap<String, String> {
    values
        .iter()
        .map(|(name, value)| {
            let text = match value {
                JsonValue::Null => String::new(),
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.trim().to_string(), text)
        })
        .collect()
}

fn check_required_fields(
    fields: &[CustomField],
    values: &HashMap<String, String>,
) -> Result<(), FunctionError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|field| field.required)
        .filter(|field| {
            values
                .get(&field.name)
                .is_none_or(|value| value.trim().is_empty())
        })
        .map(|field| field.label.as_deref().unwrap_or(&field.name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FunctionError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}

fn validate_signer(input: &SignerInput) -> Result<NewSigner, FunctionError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(FunctionError::Validation("signer name is required".to_string()));
    }

    let email = input.email.trim().to_lowercase();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });
    if !well_formed || email.chars().any(char::is_whitespace) {
        return Err(FunctionError::Validation(
            "signer email is invalid".to_string(),
        ));
    }

    let cpf = match input.cpf.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
            if digits.len() != 11 {
                return Err(FunctionError::Validation(
                    "signer CPF must have 11 digits".to_string(),
                ));
            }
            Some(digits)
        }
    };

    Ok(NewSigner {
        name: name.to_string(),
        email,
        cpf,
        token: String::new(),
    })
}

struct DecodedAttachment {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

fn decode_attachments(inputs: &[AttachmentInput]) -> Result<Vec<DecodedAttachment>, FunctionError> {
    if inputs.len() > MAX_ATTACHMENTS {
        return Err(FunctionError::Validation(format!(
            "at most {MAX_ATTACHMENTS} attachments are accepted"
        )));
    }

    let mut used_names: Vec<String> = Vec::with_capacity(inputs.len());
    let mut decoded = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        let bytes = BASE64.decode(input.content_base64.trim()).map_err(|_| {
            FunctionError::Validation(format!("attachment {} is not valid base64", input.file_name))
        })?;
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(FunctionError::Validation(format!(
                "attachment {} exceeds {} bytes",
                input.file_name, MAX_ATTACHMENT_BYTES
            )));
        }

        let base_name = sanitize_file_name(&input.file_name)
            .unwrap_or_else(|| format!("anexo-{}", index + 1));
        let mut file_name = base_name.clone();
        let mut suffix = index + 1;
        while used_names.contains(&file_name) {
            file_name = format!("{suffix}-{base_name}");
            suffix += 1;
        }
        used_names.push(file_name.clone());

        decoded.push(DecodedAttachment {
            file_name,
            content_type: input
                .content_type
                .clone()
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ATTACHMENT_CONTENT_TYPE.to_string()),
            bytes,
        });
    }

    Ok(decoded)
}

/// Last path component with anything outside `[A-Za-z0-9._-]` replaced.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Lowercase ASCII file stem derived from a template name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase).map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "documento".to_string()
    } else {
        slug.to_string()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; SIGNER_TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(name: &str, label: Option<&str>, required: bool) -> CustomField {
        CustomField {
            name: name.to_string(),
            label: label.map(str::to_string),
            required,
        }
    }

    #[test]
    fn slug_folds_accents_and_separators() {
        assert_eq!(slugify("Contrato de Locação  Residencial"), "contrato-de-locacao-residencial");
        assert_eq!(slugify("  Procuração (Ad Judicia) "), "procuracao-ad-judicia");
        assert_eq!(slugify("***"), "documento");
    }

    #[test]
    fn json_values_are_flattened() {
        let values = field_values(
            json!({ " NOME ": "Ana", "IDADE": 41, "ATIVO": true, "OBS": null })
                .as_object()
                .unwrap(),
        );
        assert_eq!(values["NOME"], "Ana");
        assert_eq!(values["IDADE"], "41");
        assert_eq!(values["ATIVO"], "true");
        assert_eq!(values["OBS"], "");
    }

    #[test]
    fn missing_required_fields_are_reported_by_label() {
        let fields = vec![
            field("NOME", Some("Nome completo"), true),
            field("CPF", None, true),
            field("OBS", None, false),
        ];
        let values = HashMap::from([("CPF".to_string(), "  ".to_string())]);

        let err = check_required_fields(&fields, &values).unwrap_err();
        assert_eq!(err.to_string(), "missing required fields: Nome completo, CPF");
    }

    #[test]
    fn signer_validation() {
        let ok = validate_signer(&SignerInput {
            name: " Ana ".to_string(),
            email: " Ana@Example.com ".to_string(),
            cpf: Some("123.456.789-09".to_string()),
        })
        .unwrap();
        assert_eq!(ok.name, "Ana");
        assert_eq!(ok.email, "ana@example.com");
        assert_eq!(ok.cpf.as_deref(), Some("12345678909"));

        for (name, email, cpf) in [
            ("", "a@b.com", None),
            ("Ana", "ana", None),
            ("Ana", "ana@localhost", None),
            ("Ana", "a@b.com", Some("123")),
        ] {
            let result = validate_signer(&SignerInput {
                name: name.to_string(),
                email: email.to_string(),
                cpf: cpf.map(str::to_string),
            });
            assert!(matches!(result, Err(FunctionError::Validation(_))), "{name} {email}");
        }
    }

    #[test]
    fn attachment_names_are_sanitized_and_unique() {
        let encoded = BASE64.encode(b"pdf");
        let inputs = vec![
            AttachmentInput {
                file_name: "../../etc/RG frente.pdf".to_string(),
                content_type: None,
                content_base64: encoded.clone(),
            },
            AttachmentInput {
                file_name: "C:\\docs\\RG frente.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                content_base64: encoded,
            },
        ];

        let decoded = decode_attachments(&inputs).unwrap();
        assert_eq!(decoded[0].file_name, "RG_frente.pdf");
        assert_eq!(decoded[0].content_type, DEFAULT_ATTACHMENT_CONTENT_TYPE);
        assert_eq!(decoded[1].file_name, "2-RG_frente.pdf");
        assert_eq!(decoded[1].bytes, b"pdf");
    }

    #[test]
    fn renamed_attachment_skips_names_already_taken() {
        let encoded = BASE64.encode(b"pdf");
        let inputs: Vec<AttachmentInput> = ["a.pdf", "3-a.pdf", "a.pdf"]
            .into_iter()
            .map(|name| AttachmentInput {
                file_name: name.to_string(),
                content_type: None,
                content_base64: encoded.clone(),
            })
            .collect();

        let names: Vec<String> = decode_attachments(&inputs)
            .unwrap()
            .into_iter()
            .map(|attachment| attachment.file_name)
            .collect();
        assert_eq!(names, vec!["a.pdf", "3-a.pdf", "4-a.pdf"]);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let inputs = vec![AttachmentInput {
            file_name: "a.pdf".to_string(),
            content_type: None,
            content_base64: "%%%".to_string(),
        }];
        assert!(matches!(
            decode_attachments(&inputs),
            Err(FunctionError::Validation(_))
        ));
    }

    #[test]
    fn tokens_are_random_hex() {
        let a = generate_token();
        assert_eq!(a.len(), SIGNER_TOKEN_BYTES * 2);
        assert_ne!(a, generate_token());
    }
}
