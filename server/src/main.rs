#[tokio::main]
async fn main() {
    gatehunt::start_server().await;
}
