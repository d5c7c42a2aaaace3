use sqlagent_core::{Runnable, RunnableExt, SqlAgentError};

struct AddPrefix;
struct Uppercase;
struct Fails;

#[async_trait::async_trait]
impl Runnable<String, String> for AddPrefix {
    async fn invoke(&self, input: String) -> Result<String, SqlAgentError> {
        Ok(format!("pre-{input}"))
    }
}

#[async_trait::async_trait]
impl Runnable<String, usize> for Uppercase {
    async fn invoke(&self, input: String) -> Result<usize, SqlAgentError> {
        Ok(input.to_uppercase().len())
    }
}

#[async_trait::async_trait]
impl Runnable<String, String> for Fails {
    async fn invoke(&self, _input: String) -> Result<String, SqlAgentError> {
        Err(SqlAgentError::Custom("boom".to_string()))
    }
}

#[tokio::test]
async fn chain_feeds_output_into_next() {
    let chain = AddPrefix.then(Uppercase);
    let output = chain.invoke("abc".to_string()).await.unwrap();
    assert_eq!(output, "pre-abc".len());
}

#[tokio::test]
async fn chain_stops_at_first_error() {
    let chain = Fails.then(Uppercase);
    let err = chain.invoke("abc".to_string()).await.unwrap_err();
    assert!(matches!(err, SqlAgentError::Custom(msg) if msg == "boom"));
}

#[tokio::test]
async fn boxed_runnables_chain() {
    let head: Box<dyn Runnable<String, String> + Send + Sync> = Box::new(AddPrefix);
    let chain = head.then(AddPrefix);
    let output = chain.invoke("x".to_string()).await.unwrap();
    assert_eq!(output, "pre-pre-x");
}
