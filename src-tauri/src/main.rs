fn main() {
    typeclip_lib::run()
}
