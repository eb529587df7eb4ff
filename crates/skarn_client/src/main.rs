fn main() {
    skarn_client::app::run();
}
