//! Integration tests for signer one-time codes.

mod test_utils;

use async_trait::async_trait;
use chrono::Duration;
use lexcrm::config::OtpConfig;
use lexcrm::error::FunctionError;
use lexcrm::mail::{MailError, Mailer, OutgoingEmail, RecordingMailer};
use lexcrm::otp::SignerOtpService;
use std::sync::Arc;
use test_utils::*;
use uuid::Uuid;

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: OutgoingEmail) -> Result<(), MailError> {
        Err(MailError::Transport("relay unavailable".to_string()))
    }
}

fn code_from(email: &OutgoingEmail) -> String {
    email
        .text_body
        .lines()
        .map(str::trim)
        .find(|line| line.len() == 6 && line.chars().all(|c| c.is_ascii_digit()))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn send_stores_hash_and_emails_code() {
    let db = setup_test_db().await.unwrap();
    let now = fixed_now();
    let fixture = create_signature_request(&db, Uuid::new_v4(), now, "maria@example.com").await;
    let mailer = RecordingMailer::new();
    let policy = OtpConfig::default();

    let sent = SignerOtpService::new(&db, &mailer, &policy)
        .send(&fixture.token, "  MARIA@example.com ", now)
        .await
        .unwrap();

    assert_eq!(sent.expires_at, now + Duration::minutes(5));

    let emails = mailer.sent().await;
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].to_address, "maria@example.com");
    let code = code_from(&emails[0]);
    assert!(!emails[0].subject.contains(&code));
    assert!(emails[0].html_body.contains(&code));
    assert!(emails[0].html_body.contains("Procuração - Maria"));

    let signer = find_signer(&db, fixture.signer_id).await;
    let hash = signer.otp_hash.unwrap();
    assert_ne!(hash, code);
    assert!(lexcrm::otp::verify_code(&signer.otp_salt.unwrap(), &code, &hash));
    assert_eq!(signer.otp_attempts, 0);
}

#[tokio::test]
async fn resend_inside_cooldown_is_refused() {
    let db = setup_test_db().await.unwrap();
    let now = fixed_now();
    let fixture = create_signature_request(&db, Uuid::new_v4(), now, "maria@example.com").await;
    let mailer = RecordingMailer::new();
    let policy = OtpConfig::default();
    let service = SignerOtpService::new(&db, &mailer, &policy);

    service
        .send(&fixture.token, "maria@example.com", now)
        .await
        .unwrap();
    let err = service
        .send(&fixture.token, "maria@example.com", now + Duration::seconds(20))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FunctionError::Cooldown {
            retry_after_seconds: 40
        }
    ));
    assert_eq!(err.body().retry_after_seconds, Some(40));

    service
        .send(&fixture.token, "maria@example.com", now + Duration::seconds(60))
        .await
        .unwrap();
    assert_eq!(mailer.sent().await.len(), 2);
}

#[tokio::test]
async fn send_requires_matching_email() {
    let db = setup_test_db().await.unwrap();
    let now = fixed_now();
    let fixture = create_signature_request(&db, Uuid::new_v4(), now, "maria@example.com").await;
    let mailer = RecordingMailer::new();
    let policy = OtpConfig::default();

    let err = SignerOtpService::new(&db, &mailer, &policy)
        .send(&fixture.token, "outra@example.com", now)
        .await
        .unwrap_err();

    assert!(matches!(err, FunctionError::Forbidden(_)));
    assert!(mailer.sent().await.is_empty());
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let db = setup_test_db().await.unwrap();
    let mailer = RecordingMailer::new();
    let policy = OtpConfig::default();

    let err = SignerOtpService::new(&db, &mailer, &policy)
        .send("nope", "maria@example.com", fixed_now())
        .await
        .unwrap_err();

    assert!(matches!(err, FunctionError::NotFound(_)));
}

#[tokio::test]
async fn failed_delivery_discards_code_and_lifts_cooldown() {
    let db = setup_test_db().await.unwrap();
    let now = fixed_now();
    let fixture = create_signature_request(&db, Uuid::new_v4(), now, "maria@example.com").await;
    let policy = OtpConfig::default();

    let err = SignerOtpService::new(&db, &FailingMailer, &policy)
        .send(&fixture.token, "maria@example.com", now)
        .await
        .unwrap_err();
    assert!(matches!(err, FunctionError::Mail(_)));

    let signer = find_signer(&db, fixture.signer_id).await;
    assert!(signer.otp_hash.is_none());
    assert!(signer.otp_sent_at.is_none());

    let mailer = RecordingMailer::new();
    SignerOtpService::new(&db, &mailer, &policy)
        .send(&fixture.token, "maria@example.com", now + Duration::seconds(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn verify_accepts_only_the_issued_code_once() {
    let db = setup_test_db().await.unwrap();
    let now = fixed_now();
    let fixture = create_signature_request(&db, Uuid::new_v4(), now, "maria@example.com").await;
    let mailer = RecordingMailer::new();
    let policy = OtpConfig::default();
    let service = SignerOtpService::new(&db, &mailer, &policy);

    service
        .send(&fixture.token, "maria@example.com", now)
        .await
        .unwrap();
    let code = code_from(&mailer.sent().await[0]);
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let err = service
        .verify(&fixture.token, wrong, now + Duration::seconds(30))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid code; 4 attempts left");
    assert_eq!(find_signer(&db, fixture.signer_id).await.otp_attempts, 1);

    let verified = service
        .verify(&fixture.token, &code, now + Duration::seconds(40))
        .await
        .unwrap();
    assert_eq!(verified.verified_at, now + Duration::seconds(40));

    let signer = find_signer(&db, fixture.signer_id).await;
    assert!(signer.verified_at.is_some());
    assert!(signer.otp_hash.is_none());

    assert!(matches!(
        service
            .verify(&fixture.token, &code, now + Duration::seconds(50))
            .await,
        Err(FunctionError::Validation(_))
    ));
}

#[tokio::test]
async fn verify_rejects_expired_code() {
    let db = setup_test_db().await.unwrap();
    let now = fixed_now();
    let fixture = create_signature_request(&db, Uuid::new_v4(), now, "maria@example.com").await;
    let mailer = RecordingMailer::new();
    let policy = OtpConfig::default();
    let service = SignerOtpService::new(&db, &mailer, &policy);

    service
        .send(&fixture.token, "maria@example.com", now)
        .await
        .unwrap();
    let code = code_from(&mailer.sent().await[0]);

    let err = service
        .verify(&fixture.token, &code, now + Duration::minutes(5))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "code expired; request a new one");
}

#[tokio::test]
async fn verify_locks_after_max_attempts() {
    let db = setup_test_db().await.unwrap();
    let now = fixed_now();
    let fixture = create_signature_request(&db, Uuid::new_v4(), now, "maria@example.com").await;
    let mailer = RecordingMailer::new();
    let policy = OtpConfig {
        max_attempts: 2,
        ..OtpConfig::default()
    };
    let service = SignerOtpService::new(&db, &mailer, &policy);

    service
        .send(&fixture.token, "maria@example.com", now)
        .await
        .unwrap();
    let code = code_from(&mailer.sent().await[0]);
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..2 {
        assert!(service.verify(&fixture.token, wrong, now).await.is_err());
    }

    assert!(matches!(
        service.verify(&fixture.token, &code, now).await,
        Err(FunctionError::Forbidden(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_wrong_guesses_respect_attempt_limit() {
    let db = setup_test_db().await.unwrap();
    let now = fixed_now();
    let fixture = create_signature_request(&db, Uuid::new_v4(), now, "maria@example.com").await;
    let mailer = Arc::new(RecordingMailer::new());
    let policy = OtpConfig::default();

    SignerOtpService::new(&db, mailer.as_ref(), &policy)
        .send(&fixture.token, "maria@example.com", now)
        .await
        .unwrap();
    let code = code_from(&mailer.sent().await[0]);
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let tasks: Vec<_> = (0..30)
        .map(|_| {
            let db = db.clone();
            let mailer = Arc::clone(&mailer);
            let policy = policy.clone();
            let token = fixture.token.clone();
            tokio::spawn(async move {
                SignerOtpService::new(&db, mailer.as_ref(), &policy)
                    .verify(&token, wrong, now + Duration::seconds(10))
                    .await
            })
        })
        .collect();

    let mut checked = 0;
    let mut locked = 0;
    for task in tasks {
        match task.await.unwrap() {
            Err(FunctionError::Validation(_)) => checked += 1,
            Err(FunctionError::Forbidden(_)) => locked += 1,
            other => panic!("unexpected verify outcome: {other:?}"),
        }
    }

    assert_eq!(checked, 5);
    assert_eq!(locked, 25);
    assert_eq!(find_signer(&db, fixture.signer_id).await.otp_attempts, 5);

    assert!(matches!(
        SignerOtpService::new(&db, mailer.as_ref(), &policy)
            .verify(&fixture.token, &code, now + Duration::seconds(20))
            .await,
        Err(FunctionError::Forbidden(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_sends_email_a_single_code() {
    let db = setup_test_db().await.unwrap();
    let now = fixed_now();
    let fixture = create_signature_request(&db, Uuid::new_v4(), now, "maria@example.com").await;
    let mailer = Arc::new(RecordingMailer::new());
    let policy = OtpConfig::default();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let db = db.clone();
            let mailer = Arc::clone(&mailer);
            let policy = policy.clone();
            let token = fixture.token.clone();
            tokio::spawn(async move {
                SignerOtpService::new(&db, mailer.as_ref(), &policy)
                    .send(&token, "maria@example.com", now)
                    .await
            })
        })
        .collect();

    let mut sent = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => sent += 1,
            Err(FunctionError::Cooldown {
                retry_after_seconds,
            }) => assert!(retry_after_seconds > 0),
            Err(other) => panic!("unexpected send outcome: {other:?}"),
        }
    }

    assert_eq!(sent, 1);
    let emails = mailer.sent().await;
    assert_eq!(emails.len(), 1);

    let signer = find_signer(&db, fixture.signer_id).await;
    assert!(lexcrm::otp::verify_code(
        &signer.otp_salt.unwrap(),
        &code_from(&emails[0]),
        &signer.otp_hash.unwrap()
    ));
}
