//! Integration tests for the SMTP session.
//!
//! Each test scripts the exact bytes a server would exchange, so the client
//! is checked against the wire rather than against its own serializer.

#![allow(clippy::unwrap_used)]

use sheetmail_smtp::{Address, Client, Envelope, Error, SmtpStream};
use tokio_test::io::Builder;

const GREETING: &[u8] = b"220 smtp.example.com ESMTP ready\r\n";
const EHLO: &[u8] = b"EHLO client.test\r\n";

fn envelope(to: &[&str]) -> Envelope {
    let mut env = Envelope::new(
        Address::new("lecturer@example.com").unwrap(),
        Address::new(to[0]).unwrap(),
    );
    for extra in &to[1..] {
        env = env.with_recipient(Address::new(*extra).unwrap());
    }
    env
}

#[tokio::test]
async fn test_one_session_carries_several_messages() {
    let mock = Builder::new()
        .read(GREETING)
        .write(EHLO)
        .read(b"250-smtp.example.com\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n")
        .write(b"AUTH PLAIN AGxlY3R1cmVyQGV4YW1wbGUuY29tAHNlY3JldA==\r\n")
        .read(b"235 2.7.0 Authentication successful\r\n")
        // first message
        .write(b"MAIL FROM:<lecturer@example.com> BODY=8BITMIME\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<ana@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go ahead\r\n")
        .write(b"Subject: one\r\n\r\nHi Ana\r\n.\r\n")
        .read(b"250 queued as 1\r\n")
        // second message, with a blind copy
        .write(b"MAIL FROM:<lecturer@example.com> BODY=8BITMIME\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<ben@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<office@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go ahead\r\n")
        .write(b"Subject: two\r\n\r\nHi Ben\r\n.\r\n")
        .read(b"250 queued as 2\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 bye\r\n")
        .build();

    let mut client = Client::connect(SmtpStream::new(mock, true))
        .await
        .unwrap()
        .ehlo("client.test")
        .await
        .unwrap()
        .authenticate("lecturer@example.com", "secret")
        .await
        .unwrap();

    assert_eq!(client.server_info().hostname, "smtp.example.com");
    assert!(client.is_encrypted());

    client
        .send_mail(&envelope(&["ana@example.com"]), b"Subject: one\r\n\r\nHi Ana\r\n")
        .await
        .unwrap();
    client
        .send_mail(
            &envelope(&["ben@example.com", "office@example.com"]),
            b"Subject: two\n\nHi Ben\n",
        )
        .await
        .unwrap();
    client.quit().await.unwrap();
}

#[tokio::test]
async fn test_refused_recipient_resets_and_session_continues() {
    let mock = Builder::new()
        .read(GREETING)
        .write(EHLO)
        .read(b"250 smtp.example.com\r\n")
        .write(b"MAIL FROM:<lecturer@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<ghost@example.com>\r\n")
        .read(b"550 5.1.1 no such user\r\n")
        .write(b"RSET\r\n")
        .read(b"250 flushed\r\n")
        .write(b"MAIL FROM:<lecturer@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<ana@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go ahead\r\n")
        .write(b"Hi\r\n.\r\n")
        .read(b"250 queued\r\n")
        .build();

    let mut client = Client::connect(SmtpStream::new(mock, false))
        .await
        .unwrap()
        .ehlo("client.test")
        .await
        .unwrap()
        .without_auth();

    let err = client
        .send_mail(&envelope(&["ghost@example.com"]), b"Hi\r\n")
        .await
        .unwrap_err();
    assert!(err.is_permanent());
    assert!(!err.is_connection_error());
    assert!(matches!(err, Error::SmtpError { code: 550, .. }));

    client
        .send_mail(&envelope(&["ana@example.com"]), b"Hi\r\n")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_login_used_when_plain_missing() {
    let mock = Builder::new()
        .read(GREETING)
        .write(EHLO)
        .read(b"250-smtp.example.com\r\n250 AUTH LOGIN\r\n")
        .write(b"AUTH LOGIN\r\n")
        .read(b"334 VXNlcm5hbWU6\r\n")
        .write(b"bGVjdHVyZXJAZXhhbXBsZS5jb20=\r\n")
        .read(b"334 UGFzc3dvcmQ6\r\n")
        .write(b"c2VjcmV0\r\n")
        .read(b"235 ok\r\n")
        .build();

    let client = Client::connect(SmtpStream::new(mock, true))
        .await
        .unwrap()
        .ehlo("client.test")
        .await
        .unwrap();
    client
        .authenticate("lecturer@example.com", "secret")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_bad_password_is_reported() {
    let mock = Builder::new()
        .read(GREETING)
        .write(EHLO)
        .read(b"250-smtp.example.com\r\n250 AUTH PLAIN\r\n")
        .write(b"AUTH PLAIN AGxlY3R1cmVyQGV4YW1wbGUuY29tAHNlY3JldA==\r\n")
        .read(b"535 5.7.8 Authentication credentials invalid\r\n")
        .build();

    let client = Client::connect(SmtpStream::new(mock, true))
        .await
        .unwrap()
        .ehlo("client.test")
        .await
        .unwrap();
    let err = client
        .authenticate("lecturer@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SmtpError { code: 535, .. }));
}

#[tokio::test]
async fn test_no_supported_mechanism() {
    let mock = Builder::new()
        .read(GREETING)
        .write(EHLO)
        .read(b"250-smtp.example.com\r\n250 AUTH CRAM-MD5\r\n")
        .build();

    let client = Client::connect(SmtpStream::new(mock, true))
        .await
        .unwrap()
        .ehlo("client.test")
        .await
        .unwrap();
    let err = client.authenticate("u", "p").await.unwrap_err();
    assert!(matches!(err, Error::NoAuthMechanism(ref offered) if offered == "CRAM-MD5"));
}

#[tokio::test]
async fn test_size_limit_checked_before_sending() {
    let mock = Builder::new()
        .read(GREETING)
        .write(EHLO)
        .read(b"250-smtp.example.com\r\n250 SIZE 10\r\n")
        .build();

    let mut client = Client::connect(SmtpStream::new(mock, false))
        .await
        .unwrap()
        .ehlo("client.test")
        .await
        .unwrap()
        .without_auth();
    let err = client
        .send_mail(&envelope(&["ana@example.com"]), b"far more than ten bytes")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MessageTooLarge { limit: 10, .. }));
}

#[tokio::test]
async fn test_size_parameter_sent_when_advertised() {
    let mock = Builder::new()
        .read(GREETING)
        .write(EHLO)
        .read(b"250-smtp.example.com\r\n250 SIZE\r\n")
        .write(b"MAIL FROM:<lecturer@example.com> SIZE=4\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<ana@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go ahead\r\n")
        .write(b"Hi\r\n.\r\n")
        .read(b"250 queued\r\n")
        .build();

    let mut client = Client::connect(SmtpStream::new(mock, false))
        .await
        .unwrap()
        .ehlo("client.test")
        .await
        .unwrap()
        .without_auth();
    client
        .send_mail(&envelope(&["ana@example.com"]), b"Hi\r\n")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_service_shutdown_is_a_connection_error() {
    let mock = Builder::new()
        .read(GREETING)
        .write(EHLO)
        .read(b"250 smtp.example.com\r\n")
        .write(b"MAIL FROM:<lecturer@example.com>\r\n")
        .read(b"421 4.3.2 shutting down\r\n")
        .build();

    let mut client = Client::connect(SmtpStream::new(mock, false))
        .await
        .unwrap()
        .ehlo("client.test")
        .await
        .unwrap()
        .without_auth();
    let err = client
        .send_mail(&envelope(&["ana@example.com"]), b"Hi\r\n")
        .await
        .unwrap_err();
    assert!(err.is_connection_error());
}

#[tokio::test]
async fn test_refused_greeting() {
    let mock = Builder::new()
        .read(b"554 no service for you\r\n")
        .build();
    let err = Client::connect(SmtpStream::new(mock, false))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SmtpError { code: 554, .. }));
}

#[tokio::test]
async fn test_starttls_requires_extension() {
    let mock = Builder::new()
        .read(GREETING)
        .write(EHLO)
        .read(b"250 smtp.example.com\r\n")
        .build();

    let client = Client::connect(SmtpStream::new(mock, false))
        .await
        .unwrap()
        .ehlo("client.test")
        .await
        .unwrap();
    let err = client
        .starttls("smtp.example.com", "client.test")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)));
}

#[tokio::test]
async fn test_noop_checks_the_session() {
    let mock = Builder::new()
        .read(GREETING)
        .write(EHLO)
        .read(b"250 smtp.example.com\r\n")
        .write(b"NOOP\r\n")
        .read(b"250 2.0.0 OK\r\n")
        .write(b"NOOP\r\n")
        .read(b"421 4.4.2 idle too long\r\n")
        .build();

    let mut client = Client::connect(SmtpStream::new(mock, false))
        .await
        .unwrap()
        .ehlo("client.test")
        .await
        .unwrap()
        .without_auth();
    client.noop().await.unwrap();
    let err = client.noop().await.unwrap_err();
    assert!(err.is_connection_error());
}
