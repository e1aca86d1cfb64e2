pub mod forest;
pub mod kmeans;
pub mod scaler;
pub mod tfidf;

pub use forest::RandomForestRegressor;
pub use kmeans::KMeans;
pub use scaler::StandardScaler;
pub use tfidf::TfidfVectorizer;
