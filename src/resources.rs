//! Lecteur de ressources Servo.
//!
//! Servo a besoin d'un ensemble de fichiers de ressources (listes de domaines
//! publics, HSTS preload, pages d'erreur, etc.). L'embedder fournit une
//! implémentation de `ResourceReaderMethods` enregistrée via
//! `servo::resources::set()`.
//!
//! Le dossier `resources/` est résolu une seule fois, dans cet ordre :
//! 1. Variable d'environnement `SERVO_RESOURCES_PATH`
//! 2. À côté de l'exécutable (`<exe_dir>/resources/`), ou à la racine du
//!    projet quand l'exécutable est sous `target/`
//! 3. Dans le répertoire courant (`./resources/`)

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use servo::resources::{self, Resource};
use tracing::{info, warn};

/// Résout le dossier de ressources et enregistre le lecteur.
///
/// **Doit être appelé avant `ServoBuilder::build()`**, sinon Servo
/// paniquera avec "Resource reader not set".
pub fn init() -> io::Result<PathBuf> {
    let root = find_resources_dir().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "dossier 'resources/' introuvable (définissez SERVO_RESOURCES_PATH)",
        )
    })?;
    let root = root.canonicalize()?;
    info!(path = %root.display(), "Ressources Servo");
    resources::set(Box::new(ResourceReader { root: root.clone() }));
    Ok(root)
}

struct ResourceReader {
    /// Chemin canonique, fixé à l'initialisation.
    root: PathBuf,
}

impl resources::ResourceReaderMethods for ResourceReader {
    fn read(&self, file: Resource) -> Vec<u8> {
        let read = resolve_within(&self.root, file.filename()).and_then(fs::read);
        match read {
            Ok(bytes) => bytes,
            Err(e) => {
                // Servo traite une ressource vide comme absente.
                warn!(file = file.filename(), error = %e, "Ressource Servo illisible");
                Vec::new()
            }
        }
    }

    fn sandbox_access_files_dirs(&self) -> Vec<PathBuf> {
        vec![self.root.clone()]
    }

    fn sandbox_access_files(&self) -> Vec<PathBuf> {
        vec![]
    }
}

/// Chemin canonique de `name` sous `root`, refusé s'il en sort.
///
/// `root` doit déjà être canonique.
fn resolve_within(root: &Path, name: &str) -> io::Result<PathBuf> {
    let canonical = root.join(name).canonicalize()?;
    if !canonical.starts_with(root) {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("'{name}' sort du dossier de ressources"),
        ));
    }
    Ok(canonical)
}

fn find_resources_dir() -> Option<PathBuf> {
    if let Ok(path) = env::var("SERVO_RESOURCES_PATH") {
        let path = PathBuf::from(path);
        if path.is_dir() {
            return Some(path);
        }
    }

    if let Ok(exe_path) = env::current_exe()
        && let Ok(canonical) = exe_path.canonicalize()
        && let Some(exe_dir) = canonical.parent()
    {
        let path = exe_dir.join("resources");
        if path.is_dir() {
            return Some(path);
        }

        // Développement : target/{debug,release}/ → racine du projet.
        if let Some(target_dir) = exe_dir.parent()
            && target_dir.file_name().is_some_and(|n| n == "target")
            && let Some(project_root) = target_dir.parent()
        {
            let path = project_root.join("resources");
            if path.is_dir() {
                return Some(path);
            }
        }
    }

    let path = env::current_dir().ok()?.join("resources");
    path.is_dir().then_some(path)
}
