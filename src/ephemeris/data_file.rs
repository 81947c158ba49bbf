use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use hifitime::ut1::Ut1Provider;

use crate::{constants::EOP_BASE_URL, engine_errors::EngineError};

/// Local storage for the data files used by the ephemeris.
///
/// Files are downloaded once into the storage directory and reused on every later start;
/// the engine only passes the directory through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemerisStore {
    dir: Utf8PathBuf,
}

impl EphemerisStore {
    /// Open (and create if needed) the storage directory.
    ///
    /// Arguments
    /// ---------
    /// * `user_dir`: an optional user-provided directory; defaults to
    ///   `<platform cache dir>/umbra_cache/ephemeris`
    ///
    /// Return
    /// ------
    /// * The store, or an error if the directory cannot be resolved or created
    pub fn new(user_dir: Option<&str>) -> Result<Self, EngineError> {
        let dir = match user_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => {
                let base_dirs = BaseDirs::new().ok_or_else(|| {
                    EngineError::InvalidStoragePath("no home directory for the cache".into())
                })?;
                let cache_dir = Utf8Path::from_path(base_dirs.cache_dir()).ok_or_else(|| {
                    EngineError::InvalidStoragePath(format!(
                        "cache directory is not UTF-8: {}",
                        base_dirs.cache_dir().display()
                    ))
                })?;
                cache_dir.join("umbra_cache").join("ephemeris")
            }
        };

        std::fs::create_dir_all(&dir)
            .map_err(|err| EngineError::InvalidStoragePath(format!("{dir}: {err}")))?;

        Ok(EphemerisStore { dir })
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Path of a data file inside the store (whether or not it exists yet).
    pub fn path_of(&self, file_name: &str) -> Utf8PathBuf {
        self.dir.join(file_name)
    }

    /// Return the local copy of a data file, downloading it only if absent.
    ///
    /// Arguments
    /// ---------
    /// * `client`: HTTP client used for the download
    /// * `file_name`: name of the file in the store and on the remote server
    /// * `base_url`: remote directory holding the file
    ///
    /// Return
    /// ------
    /// * The path to the local file
    pub async fn ensure_file(
        &self,
        client: &reqwest::Client,
        file_name: &str,
        base_url: &str,
    ) -> Result<Utf8PathBuf, EngineError> {
        let local_file = self.path_of(file_name);
        if local_file.exists() {
            log::debug!("Using stored ephemeris data {local_file}");
            return Ok(local_file);
        }

        #[cfg(feature = "eop-download")]
        {
            let url = format!("{base_url}{file_name}");
            download_big_file(client, &url, &local_file).await?;
            Ok(local_file)
        }

        #[cfg(not(feature = "eop-download"))]
        {
            let _ = (client, base_url);
            Err(EngineError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{local_file} not found and download feature is disabled"),
            )))
        }
    }

    /// Load the JPL Earth orientation parameters as a UT1 provider.
    pub async fn load_ut1_provider(
        &self,
        client: &reqwest::Client,
        file_name: &str,
    ) -> Result<Ut1Provider, EngineError> {
        let path = self.ensure_file(client, file_name, EOP_BASE_URL).await?;
        let provider = tokio::task::spawn_blocking(move || Ut1Provider::from_eop_file(path.as_str()))
            .await
            .map_err(|err| EngineError::ComputationAborted(err.to_string()))??;
        Ok(provider)
    }
}

/// Download a large file from a URL.
///
/// The body is streamed in chunks into `<path>.part`, which is renamed to `path` once complete,
/// so an interrupted download is never mistaken for a stored file.
///
/// Arguments
/// ---------
/// * `client`: the HTTP client
/// * `url`: the URL of the file to download
/// * `path`: the path to save the downloaded file
#[cfg(feature = "eop-download")]
async fn download_big_file(
    client: &reqwest::Client,
    url: &str,
    path: &Utf8Path,
) -> Result<(), EngineError> {
    use tokio::{fs::File, io::AsyncWriteExt};
    use tokio_stream::StreamExt;

    let partial = Utf8PathBuf::from(format!("{path}.part"));
    log::info!("Downloading {url} to {path}");

    let response = client.get(url).send().await?.error_for_status()?;
    let mut file = File::create(&partial).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&partial, path).await?;
    log::info!("Downloaded {url}");
    Ok(())
}

#[cfg(test)]
mod data_file_test {
    use super::*;

    #[test]
    fn test_user_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("ephemeris");
        let store = EphemerisStore::new(dir.to_str()).unwrap();
        assert!(store.dir().exists());
        assert_eq!(store.path_of("x.bin"), store.dir().join("x.bin"));
    }

    #[tokio::test]
    async fn test_existing_file_is_not_downloaded() {
        let tmp = tempfile::tempdir().unwrap();
        let store = EphemerisStore::new(tmp.path().to_str()).unwrap();
        std::fs::write(store.path_of("latest_eop2.long"), "stored").unwrap();

        // an unroutable base url proves no request is made
        let path = store
            .ensure_file(&reqwest::Client::new(), "latest_eop2.long", "http://127.0.0.1:9/")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "stored");
    }
}
