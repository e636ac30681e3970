use sled::Tree;

pub fn open_working_tree(store_name: &str, db: &sled::Db) -> sled::Result<Tree> {
    db.open_tree(format!("{}-working", store_name))
}
