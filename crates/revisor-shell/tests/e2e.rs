use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use revisor_auth::{Identity, IdentityProvider, SessionGate};
use revisor_core::{
    AgentsConfig, ArtifactKind, DocumentsConfig, OutputConfig, OutputFormat, RevisorError,
};
use revisor_docs::DocumentLoader;
use revisor_review::llm::{ChatModel, ChatRequest, Completion};
use revisor_review::{ReviewPipeline, ReviewerChat};
use revisor_shell::repl::{self, ReplOptions};
use revisor_shell::{InteractionShell, ShellServices};

struct StubProvider;

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, RevisorError> {
        if password != "s3cret" {
            return Err(RevisorError::IdentityProvider("INVALID_PASSWORD".into()));
        }
        Ok(Identity {
            email: email.to_string(),
            local_id: "uid-1".into(),
            id_token: "token".into(),
            refresh_token: None,
            expires_in: None,
        })
    }
}

/// Answers in order and counts calls.
struct StubModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl StubModel {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for StubModel {
    fn model(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: ChatRequest) -> Result<Completion, RevisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(last) = request.messages.last() {
            self.prompts.lock().unwrap().push(last.content.clone());
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .map(Completion::Text)
            .ok_or_else(|| RevisorError::Llm("no more replies".into()))
    }
}

struct Fixture {
    docs: tempfile::TempDir,
    out: tempfile::TempDir,
    review_model: Arc<StubModel>,
    chat_model: Arc<StubModel>,
}

impl Fixture {
    fn new(review_replies: &[&str], chat_replies: &[&str]) -> Self {
        Self {
            docs: tempfile::tempdir().unwrap(),
            out: tempfile::tempdir().unwrap(),
            review_model: StubModel::new(review_replies),
            chat_model: StubModel::new(chat_replies),
        }
    }

    fn services(&self) -> ShellServices {
        let docs = DocumentsConfig {
            dir: self.docs.path().to_path_buf(),
            extension: "txt".into(),
            ..DocumentsConfig::default()
        };
        ShellServices {
            loader: DocumentLoader::new(docs),
            reviewer: Arc::new(ReviewPipeline::new(
                self.review_model.clone(),
                None,
                &AgentsConfig::default(),
            )),
            chat: ReviewerChat::new(self.chat_model.clone()),
            output: OutputConfig {
                dir: self.out.path().to_path_buf(),
                ..OutputConfig::default()
            },
        }
    }

    fn write_manual(&self, name: &str, text: &str) {
        std::fs::write(self.docs.path().join(name), text).unwrap();
    }
}

async fn open_shell(fixture: &Fixture) -> InteractionShell {
    let mut gate = SessionGate::new(StubProvider);
    let session = gate.login("dev@example.com", "s3cret").await.unwrap().clone();
    InteractionShell::new(session, fixture.services())
}

#[tokio::test]
async fn review_document_downloads_as_xml() {
    let fixture = Fixture::new(&["findings", "<review>OK</review>"], &[]);
    let mut shell = open_shell(&fixture).await;
    shell.upload("z.abap", b"SELECT * FROM TABLE.").unwrap();

    let rendered = shell.run_review().await.unwrap().unwrap();
    assert_eq!(rendered.kind, ArtifactKind::MarkupDocument);
    assert_eq!(rendered.body, "<review>OK</review>");
    assert_eq!(rendered.language, "xml");
    assert_eq!(rendered.artifact.filename, "revisao.xml");
    assert_eq!(rendered.artifact.content_type, "application/xml");
    assert_eq!(shell.last_result(), Some(&rendered));
}

#[tokio::test]
async fn optimized_code_downloads_as_abap() {
    let fixture = Fixture::new(&["findings", "IMPROVED CODE"], &[]);
    let mut shell = open_shell(&fixture).await;
    shell.upload("z.abap", b"SELECT * FROM TABLE.").unwrap();

    let rendered = shell.run_review().await.unwrap().unwrap();
    assert_eq!(rendered.kind, ArtifactKind::SourceCode);
    assert_eq!(rendered.body, "IMPROVED CODE");
    assert_eq!(rendered.artifact.filename, "codigo_otimizado.abap");
    assert_eq!(rendered.artifact.content_type, "text/plain");
}

#[tokio::test]
async fn review_without_code_is_skipped() {
    let fixture = Fixture::new(&[], &[]);
    let mut shell = open_shell(&fixture).await;
    assert!(shell.run_review().await.unwrap().is_none());
    assert_eq!(fixture.review_model.calls(), 0);
}

#[tokio::test]
async fn ask_needs_code_and_question() {
    let fixture = Fixture::new(&[], &["It reads every column."]);
    let mut shell = open_shell(&fixture).await;

    shell.set_question(Some("Why is this slow?".into()));
    assert!(shell.ask().await.unwrap().is_none());

    shell.upload("z.abap", b"SELECT * FROM TABLE.").unwrap();
    shell.set_question(Some("   ".into()));
    assert!(shell.ask().await.unwrap().is_none());
    assert_eq!(fixture.chat_model.calls(), 0);

    shell.set_question(Some("Why is this slow?".into()));
    let answer = shell.ask().await.unwrap();
    assert_eq!(answer.as_deref(), Some("It reads every column."));
    assert_eq!(fixture.chat_model.calls(), 1);
    assert_eq!(fixture.review_model.calls(), 0);
}

#[tokio::test]
async fn ask_uses_short_reference_slice() {
    let fixture = Fixture::new(&[], &["ok"]);
    fixture.write_manual("manual.txt", &"m".repeat(5000));
    let mut shell = open_shell(&fixture).await;
    shell.upload("z.abap", b"WRITE 'x'.").unwrap();
    shell.set_question(Some("q".into()));
    shell.ask().await.unwrap();

    let prompts = fixture.chat_model.prompts.lock().unwrap();
    let run = prompts[0].chars().filter(|c| *c == 'm').count();
    assert!(run >= 2000 && run < 2100, "reference slice was {run} chars");
}

#[tokio::test]
async fn failed_review_keeps_state_for_retry() {
    let fixture = Fixture::new(&["findings"], &[]);
    let mut shell = open_shell(&fixture).await;
    shell.upload("z.abap", b"SELECT * FROM TABLE.").unwrap();

    assert!(shell.run_review().await.is_err());
    assert_eq!(shell.submission().unwrap().name(), "z.abap");
    assert!(shell.last_result().is_none());
    assert_eq!(shell.session().email(), "dev@example.com");
}

#[tokio::test]
async fn non_utf8_upload_is_rejected() {
    let fixture = Fixture::new(&[], &[]);
    let mut shell = open_shell(&fixture).await;
    shell.upload("a.abap", b"WRITE 'a'.").unwrap();
    let err = shell.upload("b.abap", &[0xff, 0xfe]).unwrap_err();
    assert!(matches!(err, RevisorError::InvalidSubmission(_)));
    assert_eq!(shell.submission().unwrap().name(), "a.abap");
}

#[tokio::test]
async fn repl_login_review_and_download() {
    let fixture = Fixture::new(&["findings", "<review>OK</review>"], &[]);
    let code = fixture.out.path().join("z.abap");
    std::fs::write(&code, "SELECT * FROM TABLE.").unwrap();

    let script = format!(
        "dev@example.com\nwrong\ndev@example.com\ns3cret\nreview\nupload {}\nreview\nshow\nquit\n",
        code.display()
    );
    let mut gate = SessionGate::new(StubProvider);
    let mut out = Vec::new();
    repl::run(
        &mut gate,
        fixture.services(),
        Cursor::new(script),
        &mut out,
        &ReplOptions::default(),
    )
    .await
    .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("login failed, check your credentials"));
    assert!(!out.contains("INVALID_PASSWORD"));
    assert!(out.contains("Welcome, dev@example.com"));
    assert!(out.contains("Upload a file first."));
    assert!(out.contains("```abap\nSELECT * FROM TABLE.\n```"));
    assert!(out.contains("<review>OK</review>"));
    assert!(out.contains("Last result: revisao.xml (markup)"));
    assert_eq!(
        std::fs::read_to_string(fixture.out.path().join("revisao.xml")).unwrap(),
        "<review>OK</review>"
    );
}

#[tokio::test]
async fn repl_never_opens_without_login() {
    let fixture = Fixture::new(&[], &[]);
    let mut gate = SessionGate::new(StubProvider);
    let mut out = Vec::new();
    repl::run(
        &mut gate,
        fixture.services(),
        Cursor::new("dev@example.com\nwrong\nreview\nhelp\n"),
        &mut out,
        &ReplOptions::default(),
    )
    .await
    .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(!out.contains("Welcome"));
    assert!(!out.contains("Commands:"));
    assert!(!gate.is_authorized());
    assert_eq!(fixture.review_model.calls(), 0);
}

#[tokio::test]
async fn repl_logout_returns_to_login() {
    let fixture = Fixture::new(&[], &[]);
    let mut gate = SessionGate::new(StubProvider);
    let mut out = Vec::new();
    let options = ReplOptions {
        format: OutputFormat::Markdown,
        ..ReplOptions::default()
    };
    repl::run(
        &mut gate,
        fixture.services(),
        Cursor::new("a@example.com\ns3cret\nlogout\nb@example.com\ns3cret\nshow\n"),
        &mut out,
        &options,
    )
    .await
    .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Logged out."));
    assert!(out.contains("User: b@example.com"));
    assert_eq!(gate.session().unwrap().email(), "b@example.com");
}
