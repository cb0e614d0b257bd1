fn main() -> anyhow::Result<()> {
    minipyc::run()
}
