#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = bookmark_viewer_lib::run(args).await;
    std::process::exit(code);
}
