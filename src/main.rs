#[tokio::main]
async fn main() {
    launchpad_avs_node::run().await;
}
