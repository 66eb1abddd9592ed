//! LSP サーバーの機能に関するテスト
//!
//! 一時ディレクトリにワークスペースを作り、インデックス後に各リクエストを直接呼び出す。

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
#![allow(missing_docs)]

use std::path::Path;

use googletest::prelude::*;
use qt_i18n_language_server::Backend;
use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;
use tower_lsp::lsp_types::*;
use tower_lsp::{
    LanguageServer,
    LspService,
};

const CATALOG: &str = include_str!("fixtures/qtiplot_it.ts");

const SOURCE: &str = r#"void AddWidgetTool::activate()
{
    d_graph->showStatus(tr("Click on plot to choose the position of the new object!"));
    setToolTip(tr("Pick a widget"));
    setStatusTip(tr("Add"));
}
"#;

const CLICK_ON_PLOT: &str = "Click on plot to choose the position of the new object!";

struct Workspace {
    dir: TempDir,
    backend: Backend,
}

impl Workspace {
    fn path(&self, relative: &str) -> std::path::PathBuf {
        self.dir.path().join(relative)
    }

    fn uri(&self, relative: &str) -> Url {
        Url::from_file_path(self.path(relative)).unwrap()
    }

    fn position(&self, relative: &str, line: u32, character: u32) -> TextDocumentPositionParams {
        TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: self.uri(relative) },
            position: Position { line, character },
        }
    }
}

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

/// カタログ 1 つとソース 1 つのワークスペースを作り、インデックスまで済ませる
async fn indexed_workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "translations/qtiplot_it.ts", CATALOG);
    write(dir.path(), "src/AddWidgetTool.cpp", SOURCE);

    let (service, _socket) = LspService::new(Backend::new);
    let backend = service.inner().clone();

    let root_uri = Url::from_file_path(dir.path()).unwrap();
    backend
        .initialize(InitializeParams {
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: root_uri,
                name: "qtiplot".to_string(),
            }]),
            ..InitializeParams::default()
        })
        .await
        .unwrap();
    backend.index_folder(dir.path()).await.unwrap();

    let workspace = Workspace { dir, backend };
    workspace
        .backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: workspace.uri("src/AddWidgetTool.cpp"),
                language_id: "cpp".to_string(),
                version: 1,
                text: SOURCE.to_string(),
            },
        })
        .await;
    workspace
}

#[tokio::test]
async fn test_initialize_reports_capabilities() {
    let (service, _socket) = LspService::new(Backend::new);

    let result = service.inner().initialize(InitializeParams::default()).await.unwrap();

    assert_that!(result.capabilities.hover_provider, some(eq(&HoverProviderCapability::Simple(true))));
    assert_that!(result.capabilities.references_provider, some(eq(&OneOf::Left(true))));
    assert_that!(
        result.server_info.map(|info| info.name),
        some(eq("qt-i18n-language-server"))
    );
}

#[tokio::test]
async fn test_hover_shows_italian_translation() {
    let workspace = indexed_workspace().await;

    let hover = workspace
        .backend
        .hover(HoverParams {
            text_document_position_params: workspace.position("src/AddWidgetTool.cpp", 2, 35),
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap()
        .unwrap();

    let HoverContents::Markup(markup) = hover.contents else {
        panic!("Expected Markup content");
    };
    assert_that!(markup.kind, eq(&MarkupKind::Markdown));
    assert_that!(
        markup.value,
        contains_substring(
            "**it_IT**: Cliccare sul grafico per scegliere la posizione del nuovo oggetto!"
        )
    );
}

#[tokio::test]
async fn test_goto_definition_jumps_to_catalog_source() {
    let workspace = indexed_workspace().await;

    let response = workspace
        .backend
        .goto_definition(GotoDefinitionParams {
            text_document_position_params: workspace.position("src/AddWidgetTool.cpp", 2, 35),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        })
        .await
        .unwrap();

    let Some(GotoDefinitionResponse::Array(locations)) = response else {
        panic!("Expected an array of locations");
    };
    assert_that!(locations.len(), eq(1));
    assert_that!(locations[0].uri, eq(&workspace.uri("translations/qtiplot_it.ts")));
    assert_that!(locations[0].range.start, eq(Position { line: 7, character: 16 }));
}

#[tokio::test]
async fn test_references_from_catalog_find_usages() {
    let workspace = indexed_workspace().await;

    let locations = workspace
        .backend
        .references(ReferenceParams {
            text_document_position: workspace.position("translations/qtiplot_it.ts", 7, 20),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: ReferenceContext { include_declaration: false },
        })
        .await
        .unwrap()
        .unwrap_or_default();

    assert_that!(
        locations,
        elements_are![all![
            field!(Location.uri, eq(&workspace.uri("src/AddWidgetTool.cpp"))),
            field!(Location.range, field!(Range.start, field!(Position.line, eq(&2))))
        ]]
    );
}

#[tokio::test]
async fn test_completion_offers_context_sources() {
    let workspace = indexed_workspace().await;

    let response = workspace
        .backend
        .completion(CompletionParams {
            text_document_position: workspace.position("src/AddWidgetTool.cpp", 4, 24),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: None,
        })
        .await
        .unwrap();

    let Some(CompletionResponse::Array(items)) = response else {
        panic!("Expected completion items");
    };
    assert_that!(items, elements_are![field!(CompletionItem.label, eq("Add a new text label"))]);
}

#[tokio::test]
async fn test_get_translation_command_falls_back_to_source() {
    let workspace = indexed_workspace().await;

    let translated = workspace
        .backend
        .execute_command(ExecuteCommandParams {
            command: "qt-i18n.getTranslation".to_string(),
            arguments: vec![json!({
                "context": "AddWidgetTool",
                "source": CLICK_ON_PLOT,
                "language": "it_IT"
            })],
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap();
    let untranslated = workspace
        .backend
        .execute_command(ExecuteCommandParams {
            command: "qt-i18n.getTranslation".to_string(),
            arguments: vec![json!({
                "context": "AddWidgetTool",
                "source": "Add a new text label",
                "language": "it_IT"
            })],
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap();

    assert_that!(
        translated,
        some(eq(&json!({
            "language": "it_IT",
            "translation": "Cliccare sul grafico per scegliere la posizione del nuovo oggetto!"
        })))
    );
    assert_that!(
        untranslated,
        some(eq(&json!({ "language": "it_IT", "translation": "Add a new text label" })))
    );
}

#[rstest]
#[case::base_language("it")]
#[case::hyphenated("it-IT")]
#[case::lowercase("it_it")]
#[tokio::test]
async fn test_get_translation_resolves_language_variants(#[case] language: &str) {
    let workspace = indexed_workspace().await;

    let result = workspace
        .backend
        .execute_command(ExecuteCommandParams {
            command: "qt-i18n.getTranslation".to_string(),
            arguments: vec![json!({
                "context": "AddWidgetTool",
                "source": CLICK_ON_PLOT,
                "language": language
            })],
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap();

    assert_that!(
        result,
        some(eq(&json!({
            "language": "it_IT",
            "translation": "Cliccare sul grafico per scegliere la posizione del nuovo oggetto!"
        })))
    );
}

#[tokio::test]
async fn test_get_translation_unknown_language_returns_source() {
    let workspace = indexed_workspace().await;

    let result = workspace
        .backend
        .execute_command(ExecuteCommandParams {
            command: "qt-i18n.getTranslation".to_string(),
            arguments: vec![json!({
                "context": "AddWidgetTool",
                "source": CLICK_ON_PLOT,
                "language": "de"
            })],
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap();

    assert_that!(result, some(eq(&json!({ "language": "de", "translation": CLICK_ON_PLOT }))));
}

#[tokio::test]
async fn test_update_catalogs_adds_new_messages() {
    let workspace = indexed_workspace().await;

    let result = workspace
        .backend
        .execute_command(ExecuteCommandParams {
            command: "qt-i18n.updateCatalogs".to_string(),
            arguments: Vec::new(),
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap()
        .unwrap();

    assert_that!(result[0]["added"], eq(&json!(2)));
    assert_that!(result[0]["kept"], eq(&json!(1)));

    let written = std::fs::read_to_string(workspace.path("translations/qtiplot_it.ts")).unwrap();
    assert_that!(written, contains_substring("<source>Pick a widget</source>"));
    assert_that!(written, contains_substring(r#"filename="../src/AddWidgetTool.cpp""#));
    assert_that!(
        written,
        contains_substring(
            "<translation>Cliccare sul grafico per scegliere la posizione del nuovo oggetto!</translation>"
        )
    );
}

#[tokio::test]
async fn test_update_catalogs_skips_unwritable_catalog() {
    let workspace = indexed_workspace().await;
    let catalog_path = workspace.path("translations/qtiplot_it.ts");
    std::fs::remove_file(&catalog_path).unwrap();
    std::fs::create_dir(&catalog_path).unwrap();

    let result = workspace
        .backend
        .execute_command(ExecuteCommandParams {
            command: "qt-i18n.updateCatalogs".to_string(),
            arguments: Vec::new(),
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap();
    let translated = workspace
        .backend
        .execute_command(ExecuteCommandParams {
            command: "qt-i18n.getTranslation".to_string(),
            arguments: vec![json!({
                "context": "AddWidgetTool",
                "source": CLICK_ON_PLOT,
                "language": "it"
            })],
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap()
        .unwrap();

    assert_that!(result, some(eq(&json!([]))));
    assert_that!(
        translated["translation"],
        eq(&json!("Cliccare sul grafico per scegliere la posizione del nuovo oggetto!"))
    );
}
