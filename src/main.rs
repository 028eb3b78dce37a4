fn main() {
    carequeue_lib::run()
}
