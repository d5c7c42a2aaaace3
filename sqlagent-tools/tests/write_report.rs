use sqlagent_agent::{ToolError, TypedTool};
use sqlagent_tools::{WriteReportArgs, WriteReportTool};

fn args(filename: &str) -> WriteReportArgs {
    WriteReportArgs {
        filename: filename.to_string(),
        html: "<h1>Orders: 3</h1>".to_string(),
    }
}

#[tokio::test]
async fn writes_html_into_report_dir() {
    let dir = tempfile::tempdir().unwrap();
    let tool = WriteReportTool::new(dir.path());

    let message = tool.run(args("reports/orders.html")).await.unwrap();

    let path = dir.path().join("reports/orders.html");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "<h1>Orders: 3</h1>");
    assert!(message.contains("orders.html"));
}

#[tokio::test]
async fn rejects_paths_outside_report_dir() {
    let dir = tempfile::tempdir().unwrap();
    let tool = WriteReportTool::new(dir.path());

    for filename in ["../escape.html", "/etc/passwd", "", "a/../../b.html"] {
        let err = tool.run(args(filename)).await.unwrap_err();
        assert!(
            matches!(err, ToolError::InvalidInput(_)),
            "{filename:?} should be rejected"
        );
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
