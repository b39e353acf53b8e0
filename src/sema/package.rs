// src/sema/package.rs
//
// Use-declaration processing: resolve import paths into packages, pull in
// their symbol tables through the Importer seam, and surface import
// problems as diagnostics.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use crate::errors::{ErrorKey, FatalError};
use crate::frontend::ast::{Program, UseDecl};
use crate::sema::analyzer::Analyzer;
use crate::sema::defs::Package;

/// Parses the files of an imported package. The implementation owns all
/// file I/O; the core only consumes the resulting ASTs.
pub trait Importer {
    fn import_package(&self, path: &Path) -> Result<Vec<Program>, FatalError>;
}

/// Import-time configuration.
#[derive(Debug, Clone, Default)]
pub struct ImportConfig {
    /// Root of the standard library; `std::` paths resolve against it.
    pub std_root: PathBuf,
}

const HEADER_EXTS: [&str; 4] = ["h", "hh", "hpp", "hxx"];

/// Reports whether a path carries a recognized foreign-header extension.
pub fn is_valid_header_ext(ext: &str) -> bool {
    HEADER_EXTS.contains(&ext)
}

/// Reports whether a link path names a standard foreign header (`<...>`).
fn is_std_header_path(link_path: &str) -> bool {
    link_path.starts_with('<') && link_path.ends_with('>')
}

impl Analyzer<'_> {
    /// Process the use declarations of a translation unit.
    ///
    /// Analysis of the unit itself continues regardless; a failed import
    /// only stops further imports, matching the accumulate-don't-throw
    /// policy.
    pub fn import_uses(
        &mut self,
        use_decls: &[UseDecl],
        importer: &dyn Importer,
        config: &ImportConfig,
    ) {
        for decl in use_decls {
            let before = self.sink.len();
            self.import_use_decl(decl, importer, config);
            if self.sink.len() > before {
                break;
            }
        }
    }

    fn import_use_decl(
        &mut self,
        decl: &UseDecl,
        importer: &dyn Importer,
        config: &ImportConfig,
    ) {
        let Some(pkg) = self.build_package(decl, config) else {
            return;
        };
        if self.table.find_package_by_path(&pkg.path).is_some() {
            self.sink.error_args(
                &decl.token,
                ErrorKey::DuplicateUseDecl,
                vec![pkg.link_path.clone()],
            );
            return;
        }
        let pkg = self.import_package_tables(pkg, decl, importer);
        self.table.packages.push(pkg);
    }

    fn build_package(&mut self, decl: &UseDecl, config: &ImportConfig) -> Option<Package> {
        if decl.cpp {
            self.build_cpp_header_package(decl)
        } else if decl.std {
            self.build_std_package(decl, config)
        } else {
            self.sink.error_args(
                &decl.token,
                ErrorKey::UseNotFound,
                vec![decl.link_path.clone()],
            );
            None
        }
    }

    /// Foreign headers have no symbol tables and no identifier; only the
    /// path is validated.
    fn build_cpp_header_package(&mut self, decl: &UseDecl) -> Option<Package> {
        let link = Path::new(&decl.link_path);
        let ext = link.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !is_valid_header_ext(ext) {
            self.sink.error_args(
                &decl.token,
                ErrorKey::InvalidHeaderExt,
                vec![ext.to_string()],
            );
            return None;
        }

        let path = if is_std_header_path(&decl.link_path) {
            PathBuf::from(&decl.link_path)
        } else {
            let full = decl.token.file.dir().join(link);
            match std::fs::metadata(&full) {
                Ok(info) if info.is_file() => full,
                _ => {
                    self.sink.error_args(
                        &decl.token,
                        ErrorKey::UseNotFound,
                        vec![decl.link_path.clone()],
                    );
                    return None;
                }
            }
        };

        Some(Package {
            path,
            link_path: decl.link_path.clone(),
            ident: String::new(),
            cpp: true,
            std: false,
            tables: Vec::new(),
        })
    }

    fn build_std_package(&mut self, decl: &UseDecl, config: &ImportConfig) -> Option<Package> {
        let rest = decl.link_path.strip_prefix("std::").unwrap_or(&decl.link_path);
        let rel = rest.replace("::", &MAIN_SEPARATOR.to_string());
        let path = config.std_root.join(rel);
        match std::fs::metadata(&path) {
            Ok(info) if info.is_dir() => {}
            _ => {
                self.sink.error_args(
                    &decl.token,
                    ErrorKey::UseNotFound,
                    vec![decl.link_path.clone()],
                );
                return None;
            }
        }

        let ident = decl
            .link_path
            .rsplit("::")
            .next()
            .unwrap_or(&decl.link_path)
            .to_string();

        Some(Package {
            path,
            link_path: decl.link_path.clone(),
            ident,
            cpp: false,
            std: true,
            tables: Vec::new(),
        })
    }

    fn import_package_tables(
        &mut self,
        mut pkg: Package,
        decl: &UseDecl,
        importer: &dyn Importer,
    ) -> Package {
        if pkg.cpp {
            return pkg;
        }
        let programs = match importer.import_package(&pkg.path) {
            Ok(programs) => programs,
            Err(fatal) => {
                tracing::debug!(error = %fatal, "package import aborted");
                self.sink.error_args(
                    &decl.token,
                    ErrorKey::UseNotFound,
                    vec![pkg.link_path.clone()],
                );
                return pkg;
            }
        };
        for program in &programs {
            let before = self.sink.len();
            let table = Analyzer::build_symbols(program, self.sink);
            if self.sink.len() > before {
                self.sink.error_args(
                    &decl.token,
                    ErrorKey::UsedPackageHasErrors,
                    vec![pkg.link_path.clone()],
                );
                return pkg;
            }
            pkg.tables.push(table);
        }
        pkg
    }
}
