/// Common commands offered alongside history when completing the first
/// token. Multi-word entries complete the whole invocation.
pub const COMMON_COMMANDS: &[&str] = &[
    "cat",
    "cd",
    "chmod",
    "clear",
    "cp",
    "curl",
    "docker build",
    "docker compose up",
    "docker ps",
    "docker run",
    "echo",
    "find",
    "git add .",
    "git branch",
    "git checkout",
    "git clone",
    "git commit -m",
    "git diff",
    "git log",
    "git pull",
    "git push",
    "git status",
    "grep",
    "help",
    "history",
    "kill",
    "ls",
    "ls -la",
    "man",
    "mkdir",
    "mv",
    "nano",
    "node",
    "npm install",
    "npm run dev",
    "npm start",
    "npm test",
    "open",
    "ping",
    "pwd",
    "python3",
    "rm",
    "rmdir",
    "ssh",
    "tar",
    "touch",
    "vim",
    "which",
];
