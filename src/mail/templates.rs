//! Bodies of the emails the service sends.

use super::OutgoingEmail;
use crate::documents::placeholders::escape_xml;

/// Verification code email sent to a signer.
pub fn signer_otp_email(
    signer_name: &str,
    signer_email: &str,
    document_name: &str,
    code: &str,
    valid_minutes: u64,
) -> OutgoingEmail {
    // The subject never carries the code.
    let subject = format!("Código de verificação para assinar \"{document_name}\"");

    let text_body = format!(
        "Olá, {signer_name}.\n\n\
         Use o código abaixo para confirmar sua identidade e assinar \"{document_name}\":\n\n\
         {code}\n\n\
         O código expira em {valid_minutes} minutos. Se você não solicitou este código, ignore este email.\n"
    );

    let html_body = format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<body style="margin:0;padding:24px;background:#f4f5f7;font-family:Arial,Helvetica,sans-serif;color:#1f2933">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0">
    <tr><td align="center">
      <table role="presentation" width="480" cellspacing="0" cellpadding="0" style="background:#ffffff;border-radius:8px;padding:32px">
        <tr><td>
          <h1 style="font-size:20px;margin:0 0 16px">Código de verificação</h1>
          <p style="margin:0 0 12px">Olá, {name}.</p>
          <p style="margin:0 0 24px">Use o código abaixo para confirmar sua identidade e assinar <strong>{document}</strong>.</p>
          <p style="font-size:32px;letter-spacing:8px;font-weight:bold;text-align:center;margin:0 0 24px">{code}</p>
          <p style="font-size:13px;color:#616e7c;margin:0">O código expira em {valid_minutes} minutos. Se você não solicitou este código, ignore este email.</p>
        </td></tr>
      </table>
    </td></tr>
  </table>
</body>
</html>"#,
        name = escape_xml(signer_name),
        document = escape_xml(document_name),
        code = escape_xml(code),
    );

    OutgoingEmail {
        to_name: Some(signer_name.to_string()),
        to_address: signer_email.to_string(),
        subject,
        text_body,
        html_body,
    }
}
