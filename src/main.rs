use repute::error::RepError;

#[tokio::main]
async fn main() -> Result<(), RepError> {
    repute::app::run().await
}
