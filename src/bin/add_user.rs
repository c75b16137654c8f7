use link_bookmarks::*;

#[tokio::main]
async fn main() {
    let args = std::env::args().collect::<Vec<_>>();

    match &args[..] {
        [_, db, name, password] => {
            let db = match database::Db::new(db) {
                Ok(db) => db,
                Err(err) => {
                    eprintln!("could not open {}: {:?}", db, err);
                    std::process::exit(1);
                },
            };

            if let Err(err) = auth::register(&db, name, password).await {
                eprintln!("could not add {}: {:?}", name, err);
                std::process::exit(1);
            }
        },
        _ => {
            eprintln!("usage: ./add_user db name password");
            std::process::exit(1);
        },
    }
}
