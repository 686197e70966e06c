fn main() -> std::process::ExitCode {
    pixelmood_lib::run()
}
